use super::{Diagnostic, Parsed};
use crate::core::models::{OpenPort, Proto};
use regex::Regex;
use std::sync::LazyLock;

static PORT_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,5})/(tcp|udp|sctp)\b").expect("port token pattern is valid"));

/// Extracts open ports from line-oriented service scan output. A line counts
/// only when it carries a `<port>/<proto>` token whose state column says
/// `open` (`open|filtered` included).
pub fn parse(output: &str) -> Parsed<OpenPort> {
    if output.trim().is_empty() {
        return Parsed::empty(Diagnostic::Empty);
    }

    let findings = output.lines().filter_map(parse_line).collect();
    Parsed::found(findings)
}

fn parse_line(line: &str) -> Option<OpenPort> {
    let caps = PORT_TOKEN_RE.captures(line)?;
    let port = caps[1].parse::<u16>().ok().filter(|p| *p != 0)?;
    let proto = Proto::parse(&caps[2])?;

    // Column layout after the token is: STATE SERVICE [VERSION...]
    let token_end = caps.get(0)?.end();
    let mut rest = line[token_end..].split_whitespace();
    let state = rest.next()?;
    if !state.split('|').any(|s| s == "open") {
        return None;
    }
    let service = rest.next().map(str::to_string);

    Some(OpenPort {
        proto,
        port,
        service,
        raw_line: line.trim_end().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NMAP_OUTPUT: &str = "\
# Nmap 7.94 scan initiated as: nmap -sV -F example.com -oN nmap.txt
Nmap scan report for example.com (93.184.216.34)
Host is up (0.012s latency).
Not shown: 97 filtered tcp ports (no-response)
PORT    STATE  SERVICE  VERSION
22/tcp  open   ssh      OpenSSH 8.9p1 Ubuntu 3ubuntu0.6
80/tcp  open   http     Apache httpd 2.4.52
443/tcp closed https
53/udp  open|filtered domain

Service detection performed. Please report any incorrect results.
";

    #[test]
    fn test_single_open_line() {
        let parsed = parse("80/tcp open http Apache httpd 2.4");
        assert_eq!(
            parsed.findings,
            vec![OpenPort {
                proto: Proto::Tcp,
                port: 80,
                service: Some("http".to_string()),
                raw_line: "80/tcp open http Apache httpd 2.4".to_string(),
            }]
        );
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_line_without_open_is_ignored() {
        assert!(parse("443/tcp closed https").findings.is_empty());
        assert!(parse("80/tcp filtered http").findings.is_empty());
    }

    #[test]
    fn test_open_outside_state_column_is_ignored() {
        assert!(parse("8080/tcp closed http-proxy Squid (open source build)").findings.is_empty());
        assert!(parse("21/tcp filtered ftp vsftpd open").findings.is_empty());
    }

    #[test]
    fn test_open_filtered_counts_as_open() {
        let parsed = parse("53/udp open|filtered domain");
        assert_eq!(parsed.findings.len(), 1);
        assert_eq!(parsed.findings[0].service.as_deref(), Some("domain"));
    }

    #[test]
    fn test_full_report() {
        let parsed = parse(NMAP_OUTPUT);
        let ports: Vec<(u16, Proto)> = parsed.findings.iter().map(|p| (p.port, p.proto)).collect();
        assert_eq!(ports, vec![(22, Proto::Tcp), (80, Proto::Tcp), (53, Proto::Udp)]);
        assert_eq!(parsed.findings[0].service.as_deref(), Some("ssh"));
        assert_eq!(
            parsed.findings[1].raw_line,
            "80/tcp  open   http     Apache httpd 2.4.52"
        );
    }

    #[test]
    fn test_open_without_port_token() {
        let line = "Warning: could not find at least 1 open and 1 closed port";
        assert!(parse(line).findings.is_empty());
    }

    #[test]
    fn test_out_of_range_port_skipped() {
        assert!(parse("99999/tcp open mystery").findings.is_empty());
        assert!(parse("0/tcp open zero").findings.is_empty());
    }

    #[test]
    fn test_empty_input_flags_diagnostic() {
        let parsed = parse("  \n");
        assert!(parsed.findings.is_empty());
        assert_eq!(parsed.diagnostics, vec![Diagnostic::Empty]);
    }

    #[test]
    fn test_binary_garbage_does_not_panic() {
        let garbage = "\u{0}\u{1}/tcp open \u{fffd}\u{fffd} 65536/udp open";
        assert!(parse(garbage).findings.is_empty());
    }
}
