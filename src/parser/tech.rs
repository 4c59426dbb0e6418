use super::{Diagnostic, Parsed};
use crate::core::models::Finding;

/// Status marker the fingerprinting tool prints before a successful
/// response's plugin list.
pub const SUCCESS_MARKER: &str = "[200 OK]";
const TAG_SEPARATOR: &str = ", ";

/// Splits the tag list that follows the success marker into `TechTag`
/// findings. Without a marker, falls back to one `TechExcerpt` holding the
/// first `excerpt_chars` characters of the output.
pub fn parse(output: &str, excerpt_chars: usize) -> Parsed<Finding> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Parsed::empty(Diagnostic::Empty);
    }

    let Some(idx) = output.find(SUCCESS_MARKER) else {
        let text: String = trimmed.chars().take(excerpt_chars).collect();
        return Parsed::found(vec![Finding::TechExcerpt { text }]).with(Diagnostic::MarkerAbsent);
    };

    let tag_line = output[idx + SUCCESS_MARKER.len()..].lines().next().unwrap_or_default();
    let tags: Vec<Finding> = tag_line
        .split(TAG_SEPARATOR)
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(|name| Finding::TechTag { name: name.to_string() })
        .collect();

    if tags.is_empty() {
        return Parsed::empty(Diagnostic::Malformed {
            detail: "no tags after success marker".to_string(),
        });
    }
    Parsed::found(tags)
}
