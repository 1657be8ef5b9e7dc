//! Helpers for TLD validation and duration strings.

use crate::error::ProspectError;
use std::time::Duration;

/// Validate a top-level domain suffix such as "com" or "co.uk".
///
/// Each dot-separated label must be 1-63 characters of lowercase ASCII
/// letters, digits or hyphens and may not start or end with a hyphen.
pub fn validate_tld(tld: &str) -> Result<(), ProspectError> {
    if tld.is_empty() {
        return Err(ProspectError::config("TLD cannot be empty"));
    }

    for label in tld.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(ProspectError::config(format!(
                "Invalid TLD '{}': labels must be 1-63 characters",
                tld
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(ProspectError::config(format!(
                "Invalid TLD '{}': labels cannot start or end with '-'",
                tld
            )));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ProspectError::config(format!(
                "Invalid TLD '{}': use lowercase letters, digits and '-'",
                tld
            )));
        }
    }

    Ok(())
}

/// Parse a duration like "500ms", "5s", "2m" or a bare number of seconds.
///
/// Returns `None` for anything else, including negative or fractional
/// values.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    if let Some(ms) = input.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = input.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = input.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        input.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Render a duration compactly for humans: "350ms", "4.2s", "3m 05s".
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tld() {
        assert!(validate_tld("com").is_ok());
        assert!(validate_tld("co.uk").is_ok());
        assert!(validate_tld("xn--p1ai").is_ok());

        assert!(validate_tld("").is_err());
        assert!(validate_tld("COM").is_err());
        assert!(validate_tld(".com").is_err());
        assert!(validate_tld("co..uk").is_err());
        assert!(validate_tld("-com").is_err());
        assert!(validate_tld("c_m").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("30S"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration(" 10s "), Some(Duration::from_secs(10)));

        assert_eq!(parse_duration("invalid"), None);
        assert_eq!(parse_duration("-5s"), None);
        assert_eq!(parse_duration("1.5s"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(350)), "350ms");
        assert_eq!(format_duration(Duration::from_millis(4200)), "4.2s");
        assert_eq!(format_duration(Duration::from_secs(185)), "3m 05s");
    }
}
