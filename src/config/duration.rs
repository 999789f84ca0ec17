//! Interval parsing for repeat mode.

use anyhow::Context;
use std::time::Duration;

/// Parse an interval like "500", "500ms", "2s", "1m" or "1h".
/// Plain numbers are milliseconds.
pub fn parse_interval(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty interval string");
    }

    let (number, unit_ms) = if let Some(num_str) = s.strip_suffix("ms") {
        (num_str, 1)
    } else if let Some(num_str) = s.strip_suffix('h') {
        (num_str, 3_600_000)
    } else if let Some(num_str) = s.strip_suffix('m') {
        (num_str, 60_000)
    } else if let Some(num_str) = s.strip_suffix('s') {
        (num_str, 1_000)
    } else {
        (s, 1)
    };

    let value: u64 = number
        .trim()
        .parse()
        .with_context(|| format!("Invalid interval value: {s}"))?;
    let millis = value
        .checked_mul(unit_ms)
        .with_context(|| format!("Interval is too large: {s}"))?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_number_is_millis() {
        assert_eq!(parse_interval("1500").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_interval("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_interval("3m").unwrap(), Duration::from_secs(180));
        assert_eq!(parse_interval("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_invalid() {
        assert!(parse_interval("").is_err());
        assert!(parse_interval("soon").is_err());
        assert!(parse_interval("-5").is_err());
    }
}
