use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use url::Url;

use crate::error::AppError;

/// Value the assistant settings template ships with for unfilled credentials.
const PLACEHOLDER: &str = "...";

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Base WebSocket address of the BLAB controller, e.g. `ws://localhost:8000`.
    pub ws_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatsonConfig {
    pub service_url: String,
    pub api_key: String,
    pub api_version: String,
    pub assistant_id: String,
    pub iam_url: String,
    pub request_timeout_secs: u64,
}

/// What to do when Watson reports that a cached session no longer exists.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpiredSessionPolicy {
    /// Surface the error; the message gets no reply.
    Fail,
    /// Forget the cached handle, open a new session and resend once.
    Recreate,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub on_expired: ExpiredSessionPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub dev_environment: bool,
    pub server: ServerConfig,
    pub controller: ControllerConfig,
    pub watson: WatsonConfig,
    pub session: SessionConfig,
}

impl Settings {
    pub fn new() -> Result<Self, AppError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_WATSON__API_KEY=...` would set `Settings.watson.api_key`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Builder preloaded with every default. Credentials (`watson.service_url`,
    /// `watson.api_key`, `watson.assistant_id`) have none and must be supplied.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", "development")?
            .set_default("dev_environment", false)?
            .set_default("server.host", "localhost")?
            .set_default("server.port", 25227)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("controller.ws_url", "ws://localhost:8000")?
            .set_default("watson.api_version", "2021-11-27")?
            .set_default("watson.iam_url", "https://iam.cloud.ibm.com/identity/token")?
            .set_default("watson.request_timeout_secs", 30)?
            .set_default("session.on_expired", "fail")
    }

    /// Rejects settings that cannot possibly work, so startup fails loudly.
    pub fn validate(&self) -> Result<(), AppError> {
        require_credential("watson.api_key", &self.watson.api_key)?;
        require_credential("watson.assistant_id", &self.watson.assistant_id)?;
        require_credential("watson.api_version", &self.watson.api_version)?;

        for (key, value) in [
            ("watson.service_url", &self.watson.service_url),
            ("watson.iam_url", &self.watson.iam_url),
        ] {
            let url = parse_url(key, value)?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(AppError::ConfigError(format!(
                    "{} must be an http(s) URL, got {}",
                    key, value
                )));
            }
        }

        let ws = parse_url("controller.ws_url", &self.controller.ws_url)?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(AppError::ConfigError(format!(
                "controller.ws_url must be a ws(s) URL, got {}",
                self.controller.ws_url
            )));
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn new_for_test() -> Result<Self, ConfigError> {
        Self::defaults()?
            .set_override("environment", "test")?
            .set_override(
                "watson.service_url",
                "https://api.test.assistant.watson.cloud.ibm.com/instances/test",
            )?
            .set_override("watson.api_key", "test_api_key")?
            .set_override("watson.assistant_id", "test-assistant")?
            .build()?
            .try_deserialize()
    }
}

fn require_credential(key: &str, value: &str) -> Result<(), AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER {
        return Err(AppError::ConfigError(format!("{} is not set", key)));
    }
    Ok(())
}

fn parse_url(key: &str, value: &str) -> Result<Url, AppError> {
    Url::parse(value)
        .map_err(|e| AppError::ConfigError(format!("{} is not a valid URL: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_source(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("app")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::new_for_test().expect("Failed to load settings");
        assert_eq!(settings.environment, "test");
        assert!(!settings.dev_environment);
        assert_eq!(settings.server.host, "localhost");
        assert_eq!(settings.server.port, 25227);
        assert_eq!(settings.server.workers as usize, num_cpus::get());
        assert_eq!(settings.controller.ws_url, "ws://localhost:8000");
        assert_eq!(settings.watson.api_version, "2021-11-27");
        assert_eq!(settings.watson.request_timeout_secs, 30);
        assert_eq!(settings.session.on_expired, ExpiredSessionPolicy::Fail);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_environment_override() {
        let config = Settings::defaults()
            .unwrap()
            .add_source(env_source(&[
                ("APP_SERVER__PORT", "9000"),
                ("APP_DEV_ENVIRONMENT", "true"),
                ("APP_WATSON__SERVICE_URL", "https://example.watson.cloud.ibm.com/instances/abc"),
                ("APP_WATSON__API_KEY", "override_key"),
                ("APP_WATSON__ASSISTANT_ID", "assistant-42"),
                ("APP_SESSION__ON_EXPIRED", "recreate"),
            ]))
            .build()
            .expect("Failed to build config")
            .try_deserialize::<Settings>()
            .expect("Failed to deserialize settings");

        assert_eq!(config.server.port, 9000);
        assert!(config.dev_environment);
        assert_eq!(config.watson.api_key, "override_key");
        assert_eq!(config.watson.assistant_id, "assistant-42");
        assert_eq!(config.session.on_expired, ExpiredSessionPolicy::Recreate);
    }

    #[test]
    fn test_invalid_port() {
        let result = Settings::defaults()
            .unwrap()
            .set_override("watson.service_url", "https://example.com")
            .unwrap()
            .set_override("watson.api_key", "k")
            .unwrap()
            .set_override("watson.assistant_id", "a")
            .unwrap()
            .add_source(env_source(&[("APP_SERVER__PORT", "invalid")]))
            .build()
            .and_then(|config| config.try_deserialize::<Settings>());

        assert!(result.is_err(), "Expected error for invalid port");
    }

    #[test]
    fn test_missing_credentials() {
        let result = Settings::defaults()
            .unwrap()
            .build()
            .and_then(|config| config.try_deserialize::<Settings>());
        assert!(result.is_err(), "Expected error when watson credentials are absent");
    }

    #[test]
    fn test_placeholder_api_key_rejected() {
        let mut settings = Settings::new_for_test().unwrap();
        settings.watson.api_key = "...".to_string();
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("watson.api_key"));
    }

    #[test]
    fn test_invalid_urls_rejected() {
        let mut settings = Settings::new_for_test().unwrap();
        settings.watson.service_url = "not a url".to_string();
        assert!(matches!(settings.validate(), Err(AppError::ConfigError(_))));

        let mut settings = Settings::new_for_test().unwrap();
        settings.controller.ws_url = "http://localhost:8000".to_string();
        assert!(matches!(settings.validate(), Err(AppError::ConfigError(_))));
    }
}
