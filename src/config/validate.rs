//! Configuration validation.

use crate::config::{AutomarkSettings, Config};
use crate::constants::export::MAX_SEGMENT_TIMEOUT_SECS;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_tools(config)?;
    validate_segments(config)?;
    validate_export(config)?;
    validate_automark(&config.automark)?;
    Ok(())
}

fn invalid(message: String) -> Error {
    Error::ConfigValidation { message }
}

fn validate_tools(config: &Config) -> Result<()> {
    if config.tools.ffmpeg.trim().is_empty() {
        return Err(invalid("tools.ffmpeg must not be empty".to_string()));
    }
    if config.tools.ffprobe.trim().is_empty() {
        return Err(invalid("tools.ffprobe must not be empty".to_string()));
    }
    Ok(())
}

fn validate_segments(config: &Config) -> Result<()> {
    if let Some(min) = config.segments.min_duration
        && !(min.is_finite() && min > 0.0)
    {
        return Err(invalid(format!(
            "segments.min_duration must be a positive number of seconds, got {min}"
        )));
    }
    Ok(())
}

/// Bitrates look like `128k` or `128000`.
fn is_valid_bitrate(value: &str) -> bool {
    let digits = value.strip_suffix(['k', 'K']).unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) && digits != "0"
}

fn validate_export(config: &Config) -> Result<()> {
    let export = &config.export;

    for (name, value) in [
        ("mp3_bitrate", &export.mp3_bitrate),
        ("aac_bitrate", &export.aac_bitrate),
    ] {
        if !is_valid_bitrate(value) {
            return Err(invalid(format!(
                "export.{name} must look like '192k', got '{value}'"
            )));
        }
    }

    if let Some(timeout) = export.segment_timeout_secs
        && !(1..=MAX_SEGMENT_TIMEOUT_SECS).contains(&timeout)
    {
        return Err(invalid(format!(
            "export.segment_timeout_secs must be between 1 and {MAX_SEGMENT_TIMEOUT_SECS}, got {timeout}"
        )));
    }

    Ok(())
}

/// Validate silence detection thresholds.
pub fn validate_automark(settings: &AutomarkSettings) -> Result<()> {
    if !(settings.threshold > 0.0 && settings.threshold < 1.0) {
        return Err(invalid(format!(
            "automark.threshold must be between 0 and 1, got {}",
            settings.threshold
        )));
    }

    if settings.window_ms == 0 {
        return Err(invalid("automark.window_ms must be at least 1".to_string()));
    }

    if !(settings.min_silence.is_finite() && settings.min_silence >= 0.0) {
        return Err(invalid(format!(
            "automark.min_silence must be non-negative, got {}",
            settings.min_silence
        )));
    }

    if !(settings.min_sound.is_finite() && settings.min_sound >= 0.0) {
        return Err(invalid(format!(
            "automark.min_sound must be non-negative, got {}",
            settings.min_sound
        )));
    }

    if !(0.0..=1.0).contains(&settings.min_valid_ratio) {
        return Err(invalid(format!(
            "automark.min_valid_ratio must be between 0 and 1, got {}",
            settings.min_valid_ratio
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_tool() {
        let mut config = Config::default();
        config.tools.ffprobe = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_bad_min_duration() {
        let mut config = Config::default();
        config.segments.min_duration = Some(0.0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_bitrate() {
        assert!(is_valid_bitrate("192k"));
        assert!(is_valid_bitrate("128000"));
        assert!(!is_valid_bitrate("k"));
        assert!(!is_valid_bitrate("fast"));

        let mut config = Config::default();
        config.export.aac_bitrate = "loud".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.export.segment_timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = Config::default();
        config.automark.threshold = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_valid_ratio_range() {
        let mut config = Config::default();
        config.automark.min_valid_ratio = -0.1;
        assert!(validate_config(&config).is_err());
    }
}
