use std::time::Duration;

use crate::models::TemplateRef;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// `name:lang`, e.g. `hello_world:en_US`. Both parts must be non-empty and
/// only one `:` is allowed.
pub fn parse_template_ref(raw: &str) -> Result<TemplateRef, String> {
    let invalid = || format!("TEMPLATE must be 'name:lang' (e.g., hello_world:en_US), got: {raw}");

    let mut parts = raw.split(':');
    let (Some(name), Some(language), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let (name, language) = (name.trim(), language.trim());
    if name.is_empty() || language.is_empty() {
        return Err(invalid());
    }
    Ok(TemplateRef {
        name: name.to_string(),
        language: language.to_string(),
    })
}

/// Seconds between sends as a non-negative real number.
pub fn parse_delay(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("RATE must be a number of seconds, got: {raw}"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("RATE must be a non-negative number of seconds, got: {raw}"));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| format!("RATE is too large to wait between sends, got: {raw}"))
}

/// `1`, `true` and `yes` (any case) switch a flag on; anything else is off.
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

pub fn validate_account_id(raw: &str) -> Result<(), String> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("WA_PHONE_NUMBER_ID must contain digits only, got: {raw}"));
    }
    Ok(())
}

pub fn validate_log_level(raw: &str) -> Result<String, String> {
    let level = raw.trim().to_ascii_lowercase();
    if LOG_LEVELS.contains(&level.as_str()) {
        Ok(level)
    } else {
        Err(format!(
            "LOG_LEVEL must be one of {}, got: {raw}",
            LOG_LEVELS.join("/")
        ))
    }
}
