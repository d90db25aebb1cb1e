//! Settings loading from disk and environment.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::config::schema::{RegistrationSettings, RouterSettings};
use crate::config::validation::{
    validate_registration_settings, validate_router_settings, ValidationError,
};
use crate::registry::endpoint::parse_url_list;

/// Error type for settings loading.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("Invalid value {value:?} for {key}")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn read_toml<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, SettingsError> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(SettingsError::Io)?;
            toml::from_str(&content).map_err(SettingsError::Parse)
        }
        None => Ok(T::default()),
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::Env { key, value })
}

/// Load router settings: file (or defaults), environment overrides, validation.
pub fn load_router_settings(path: Option<&Path>) -> Result<RouterSettings, SettingsError> {
    let mut settings: RouterSettings = read_toml(path)?;
    apply_router_overrides(&mut settings, |key| std::env::var(key).ok())?;
    validate_router_settings(&settings).map_err(SettingsError::Validation)?;
    Ok(settings)
}

/// Load registration client settings the same way.
pub fn load_registration_settings(
    path: Option<&Path>,
) -> Result<RegistrationSettings, SettingsError> {
    let mut settings: RegistrationSettings = read_toml(path)?;
    apply_registration_overrides(&mut settings, |key| std::env::var(key).ok())?;
    validate_registration_settings(&settings).map_err(SettingsError::Validation)?;
    Ok(settings)
}

pub fn apply_router_overrides<F>(settings: &mut RouterSettings, env: F) -> Result<(), SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = env("ROUTER_BIND_ADDRESS") {
        settings.listener.bind_address = value;
    }
    if let Some(value) = env("ROUTER_REPOSITORY_DIR") {
        settings.repository.dir = value;
    }
    if let Some(value) = env("ROUTER_CONFIG_WATCHER_ENABLED") {
        settings.repository.watcher_enabled = parse_env("ROUTER_CONFIG_WATCHER_ENABLED", value)?;
    }
    if let Some(value) = env("ROUTER_CONFIG_WATCHER_POLL_MS") {
        settings.repository.watcher_poll_ms = parse_env("ROUTER_CONFIG_WATCHER_POLL_MS", value)?;
    }
    Ok(())
}

pub fn apply_registration_overrides<F>(
    settings: &mut RegistrationSettings,
    env: F,
) -> Result<(), SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = env("SERVER_ID") {
        settings.server_id = value;
    }
    if let Some(value) = env("SERVER_URL") {
        settings.server_url = value;
    }
    if let Some(value) = env("SERVER_ROUTERS") {
        settings.routers = parse_url_list(&value);
    }
    if let Some(value) = env("SERVER_ROUTER_RETRY_INTERVAL_MS") {
        settings.retry_interval_ms = parse_env("SERVER_ROUTER_RETRY_INTERVAL_MS", value)?;
    }
    if let Some(value) = env("SERVER_ROUTER_MAX_ATTEMPTS") {
        settings.max_attempts = parse_env("SERVER_ROUTER_MAX_ATTEMPTS", value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_router_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ROUTER_REPOSITORY_DIR", "/data"),
            ("ROUTER_CONFIG_WATCHER_ENABLED", "true"),
        ]);
        let mut settings = RouterSettings::default();
        apply_router_overrides(&mut settings, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.repository.dir, "/data");
        assert!(settings.repository.watcher_enabled);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut settings = RegistrationSettings::default();
        let err = apply_registration_overrides(&mut settings, |k| {
            (k == "SERVER_ROUTER_MAX_ATTEMPTS").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, SettingsError::Env { key: "SERVER_ROUTER_MAX_ATTEMPTS", .. }));
    }

    #[test]
    fn test_router_list_from_env() {
        let mut settings = RegistrationSettings::default();
        apply_registration_overrides(&mut settings, |k| {
            (k == "SERVER_ROUTERS").then(|| "http://r1:9000/, http://r2:9000".to_string())
        })
        .unwrap();
        assert_eq!(settings.routers, vec!["http://r1:9000", "http://r2:9000"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.toml");
        fs::write(&path, "[listener]\nbind_address = \"127.0.0.1:9100\"\n").unwrap();
        let settings: RouterSettings = read_toml(Some(&path)).unwrap();
        assert_eq!(settings.listener.bind_address, "127.0.0.1:9100");

        fs::write(&path, "[listener\n").unwrap();
        assert!(matches!(
            read_toml::<RouterSettings>(Some(&path)),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_load_registration_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        fs::write(
            &path,
            "server_id = \"server-7\"\nserver_url = \"http://h7:8080/\"\nrouters = [\"http://r1:9000\"]\nmax_attempts = 3\n",
        )
        .unwrap();

        let settings = load_registration_settings(Some(&path)).unwrap();
        assert_eq!(settings.server_id, "server-7");
        assert_eq!(settings.routers, vec!["http://r1:9000"]);
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.retry_interval_ms, 10_000);

        fs::write(&path, "server_url = \"ftp://h7\"\nmax_attempts = 0\n").unwrap();
        match load_registration_settings(Some(&path)) {
            Err(SettingsError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                let message = SettingsError::Validation(errors).to_string();
                assert!(message.starts_with("Validation failed: server_url"));
                assert!(message.contains(", max_attempts"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
