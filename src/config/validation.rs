//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, attempts >= 1)
//! - Check addresses and router URLs are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: settings → Result<(), Vec<ValidationError>>
//! - Runs before settings are accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{RegistrationSettings, RouterSettings};
use crate::registry::endpoint::validate_endpoint;

/// A single semantic problem in a settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_router_settings(settings: &RouterSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", settings.listener.bind_address),
        ));
    }

    if settings.repository.dir.trim().is_empty() {
        errors.push(ValidationError::new("repository.dir", "must not be empty"));
    }

    if settings.repository.watcher_poll_ms == 0 {
        errors.push(ValidationError::new("repository.watcher_poll_ms", "must be greater than 0"));
    }

    if settings.recovery.attempt_interval_secs == 0 {
        errors.push(ValidationError::new(
            "recovery.attempt_interval_secs",
            "must be greater than 0",
        ));
    }

    if settings.observability.metrics_enabled
        && settings
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", settings.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_registration_settings(
    settings: &RegistrationSettings,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.server_id.trim().is_empty() {
        errors.push(ValidationError::new("server_id", "must not be empty"));
    }

    if let Err(e) = validate_endpoint(&settings.server_url) {
        errors.push(ValidationError::new("server_url", e.to_string()));
    }

    for (i, router) in settings.routers.iter().enumerate() {
        if let Err(e) = validate_endpoint(router) {
            errors.push(ValidationError::new(format!("routers[{}]", i), e.to_string()));
        }
    }

    if settings.retry_interval_ms == 0 {
        errors.push(ValidationError::new("retry_interval_ms", "must be greater than 0"));
    }

    if settings.max_attempts == 0 {
        errors.push(ValidationError::new("max_attempts", "must be at least 1"));
    }

    if let Some(max) = settings.max_backoff_ms {
        if max < settings.retry_interval_ms {
            errors.push(ValidationError::new(
                "max_backoff_ms",
                "must not be lower than retry_interval_ms",
            ));
        }
    }

    if settings.request_timeout_ms == 0 {
        errors.push(ValidationError::new("request_timeout_ms", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_router_settings(&RouterSettings::default()).is_ok());
        assert!(validate_registration_settings(&RegistrationSettings::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let settings = RegistrationSettings {
            server_id: " ".into(),
            routers: vec!["http://r1:9000/".into(), "r2".into()],
            max_attempts: 0,
            retry_interval_ms: 500,
            max_backoff_ms: Some(100),
            ..Default::default()
        };
        let errors = validate_registration_settings(&settings).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["server_id", "routers[1]", "max_attempts", "max_backoff_ms"]);
    }

    #[test]
    fn test_bad_bind_address() {
        let mut settings = RouterSettings::default();
        settings.listener.bind_address = "localhost".into();
        settings.repository.watcher_poll_ms = 0;
        let errors = validate_router_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
