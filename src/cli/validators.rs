//! CLI argument validators.
//!
//! Shared parsing functions for clap `value_parser`s.

use crate::error::Error;
use crate::marks::MarkKind;

/// A mark given on the command line as `<type>:<time>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkArg {
    /// Start or end.
    pub kind: MarkKind,
    /// Position in seconds.
    pub time: f64,
}

/// Parse a time as seconds (`75.5`), `MM:SS(.ff)` or `HH:MM:SS(.ff)`.
pub fn parse_time(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    let (last, leading) = parts.split_last()?;
    let seconds: f64 = last.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 || (!leading.is_empty() && seconds >= 60.0) {
        return None;
    }

    let mut total = seconds;
    for (part, scale) in leading.iter().rev().zip([60.0, 3600.0]) {
        let value: u32 = part.parse().ok()?;
        total += f64::from(value) * scale;
    }
    Some(total)
}

/// Parse a mark argument such as `start:12.5` or `e:1:02:03`.
pub fn parse_mark_arg(s: &str) -> Result<MarkArg, Error> {
    let invalid = || Error::InvalidMarkArgument {
        value: s.to_string(),
    };

    let (kind, time) = s.split_once(':').ok_or_else(invalid)?;
    let kind: MarkKind = kind.parse().map_err(|_| invalid())?;
    let time = parse_time(time).ok_or_else(invalid)?;
    Ok(MarkArg { kind, time })
}

/// clap adapter for [`parse_mark_arg`].
pub fn parse_mark(s: &str) -> Result<MarkArg, String> {
    parse_mark_arg(s).map_err(|e| e.to_string())
}

/// Parse a non-negative duration in seconds (same formats as [`parse_time`]).
pub fn parse_duration(s: &str) -> Result<f64, String> {
    parse_time(s).ok_or_else(|| format!("'{s}' is not a valid duration"))
}

/// Parse a strictly positive number of seconds.
pub fn parse_positive_seconds(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(value.is_finite() && value > 0.0) {
        return Err(format!("value must be greater than 0, got {value}"));
    }

    Ok(value)
}

/// Parse and validate an amplitude threshold (exclusive 0.0-1.0).
pub fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(value > 0.0 && value < 1.0) {
        return Err(format!("threshold must be between 0.0 and 1.0, got {value}"));
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_formats() {
        assert_eq!(parse_time("75.5"), Some(75.5));
        assert_eq!(parse_time("1:30"), Some(90.0));
        assert_eq!(parse_time("01:02:03.5"), Some(3723.5));
        assert_eq!(parse_time("0"), Some(0.0));
    }

    #[test]
    fn test_parse_time_invalid() {
        assert_eq!(parse_time(""), None);
        assert_eq!(parse_time("-1"), None);
        assert_eq!(parse_time("1:75"), None);
        assert_eq!(parse_time("1::2"), None);
        assert_eq!(parse_time("1:2:3:4"), None);
        assert_eq!(parse_time("abc"), None);
        assert_eq!(parse_time("inf"), None);
    }

    #[test]
    fn test_parse_mark_arg() {
        let mark = parse_mark_arg("start:12.5").unwrap();
        assert_eq!(mark.kind, MarkKind::Start);
        assert_eq!(mark.time, 12.5);

        let mark = parse_mark_arg("E:1:02").unwrap();
        assert_eq!(mark.kind, MarkKind::End);
        assert_eq!(mark.time, 62.0);
    }

    #[test]
    fn test_parse_mark_arg_invalid() {
        for value in ["12.5", "middle:3", "start:", "end:-2"] {
            assert!(
                matches!(
                    parse_mark_arg(value),
                    Err(Error::InvalidMarkArgument { .. })
                ),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_positive_seconds() {
        assert_eq!(parse_positive_seconds("0.5").ok(), Some(0.5));
        assert!(parse_positive_seconds("0").is_err());
        assert!(parse_positive_seconds("-3").is_err());
        assert!(parse_positive_seconds("NaN").is_err());
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("0.05").ok(), Some(0.05));
        assert!(parse_threshold("1.0").is_err());
        assert!(parse_threshold("0").is_err());
    }
}
