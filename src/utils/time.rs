use std::time::Duration;

/// Formats a step duration the way the console and report show it, e.g. `12.34s`.
pub fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

pub fn format_millis(ms: u64) -> String {
    format_duration(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_two_decimals() {
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1.50s");
        assert_eq!(format_millis(0), "0.00s");
    }
}
