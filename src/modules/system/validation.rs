use crate::models::{AppConfig, PacingConfig};
use std::fmt;

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
    pub actual_value: Option<String>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual_value {
            Some(val) => write!(f, "  • {}: {} (got: {})", self.field, self.message, val),
            None => write!(f, "  • {}: {}", self.field, self.message),
        }
    }
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            actual_value: None,
        }
    }

    fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            actual_value: Some(value.to_string()),
        }
    }
}

/// Check the whole config and report every violation at once.
pub fn validate_app_config(config: &AppConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.schedule.interval_secs == 0 {
        errors.push(ConfigError::with_value(
            "schedule.interval_secs",
            "must be greater than 0",
            config.schedule.interval_secs,
        ));
    }
    if config.schedule.jitter_min_secs > config.schedule.jitter_max_secs {
        errors.push(ConfigError::with_value(
            "schedule.jitter_min_secs",
            "must not exceed schedule.jitter_max_secs",
            config.schedule.jitter_min_secs,
        ));
    }
    if config.schedule.cycle_cap_secs == 0 {
        errors.push(ConfigError::with_value(
            "schedule.cycle_cap_secs",
            "must be greater than 0",
            config.schedule.cycle_cap_secs,
        ));
    }

    if config.dispatch.batch_size == 0 {
        errors.push(ConfigError::with_value(
            "dispatch.batch_size",
            "must be at least 1",
            config.dispatch.batch_size,
        ));
    }
    validate_pacing(config, &mut errors);

    if config.probe.oracle.trim().is_empty() {
        errors.push(ConfigError::new("probe.oracle", "must not be empty"));
    }
    if config.probe.probe_command.trim().is_empty() {
        errors.push(ConfigError::new("probe.probe_command", "must not be empty"));
    }
    if config.probe.max_retries == 0 {
        errors.push(ConfigError::with_value(
            "probe.max_retries",
            "must be at least 1",
            config.probe.max_retries,
        ));
    }
    if config.probe.restriction_keywords.is_empty() {
        errors.push(ConfigError::new(
            "probe.restriction_keywords",
            "must not be empty",
        ));
    }

    if config.server.enabled && config.server.port == 0 {
        errors.push(ConfigError::with_value(
            "server.port",
            "must be between 1 and 65535",
            config.server.port,
        ));
    }
    if config.transport.gateway_url.trim().is_empty() {
        errors.push(ConfigError::new("transport.gateway_url", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Pacing may never collapse to a zero delay: an unpaced batch is a burst,
/// and bursts are what get a sender flagged.
fn validate_pacing(config: &AppConfig, errors: &mut Vec<ConfigError>) {
    match &config.dispatch.pacing {
        PacingConfig::Fixed { window_secs } => {
            if *window_secs == 0 {
                errors.push(ConfigError::with_value(
                    "dispatch.pacing.window_secs",
                    "must be greater than 0",
                    window_secs,
                ));
            } else if (*window_secs as usize) < config.dispatch.batch_size {
                errors.push(ConfigError::with_value(
                    "dispatch.pacing.window_secs",
                    "window divided by batch_size must leave at least 1 second between sends",
                    window_secs,
                ));
            }
        }
        PacingConfig::Jitter { min_secs, max_secs } => {
            if *min_secs == 0 {
                errors.push(ConfigError::with_value(
                    "dispatch.pacing.min_secs",
                    "must be greater than 0",
                    min_secs,
                ));
            }
            if min_secs > max_secs {
                errors.push(ConfigError::with_value(
                    "dispatch.pacing.min_secs",
                    "must not exceed max_secs",
                    min_secs,
                ));
            }
        }
    }
}
