use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MistralError;

/// Public API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.mistral.ai";
/// Environment variable consulted when no API key is given explicitly.
pub const API_KEY_ENV: &str = "MISTRAL_API_KEY";
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Substring identifying managed-inference deployments on Azure.
const AZURE_ENDPOINT_MARKER: &str = "inference.azure.com";
/// Model substituted on Azure deployments when the call names none.
const AZURE_DEFAULT_MODEL: &str = "mistral";

/// Immutable client configuration.
///
/// Can be deserialized from a config file; `api_key` may then be left out and
/// picked up from [`API_KEY_ENV`] by [`ClientConfig::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Overall request timeout; given in (fractional) seconds in config files.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
    /// Base unit of the exponential backoff, in (fractional) seconds.
    #[serde(default = "default_backoff_unit", with = "duration_secs")]
    pub backoff_unit: Duration,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_backoff_unit() -> Duration {
    DEFAULT_BACKOFF_UNIT
}

/// Durations as floating-point seconds, e.g. `timeout = 1.5`.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl ClientConfig {
    /// Validates the configuration and fills the API key from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`MistralError::Configuration`] when no API key is available.
    pub fn resolve(self) -> Result<ResolvedConfig, MistralError> {
        let api_key = match self.api_key {
            Some(key) => key,
            None => env::var(API_KEY_ENV).map_err(|_| {
                MistralError::configuration(format!(
                    "API key not provided. Please set {API_KEY_ENV} environment variable."
                ))
            })?,
        };
        let default_model = default_model_for(&self.endpoint);

        Ok(ResolvedConfig {
            endpoint: self.endpoint,
            api_key,
            max_retries: self.max_retries,
            timeout: self.timeout,
            backoff_unit: self.backoff_unit,
            default_model,
        })
    }
}

/// Configuration after the API key and default model have been settled.
#[derive(Clone, PartialEq)]
pub struct ResolvedConfig {
    pub endpoint: String,
    pub api_key: String,
    pub max_retries: u32,
    pub timeout: Duration,
    pub backoff_unit: Duration,
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("backoff_unit", &self.backoff_unit)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl ResolvedConfig {
    /// Joins the endpoint and an API path with exactly one slash between them.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Default model implied by the endpoint.
///
/// This is a plain substring match, so any URL containing the Azure marker qualifies.
pub(crate) fn default_model_for(endpoint: &str) -> Option<String> {
    endpoint
        .contains(AZURE_ENDPOINT_MARKER)
        .then(|| AZURE_DEFAULT_MODEL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_public_api() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, "https://api.mistral.ai");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_key": "test", "max_retries": 2}"#).expect("config");
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        let resolved = config.resolve().expect("resolved");
        assert_eq!(resolved.timeout, Duration::from_secs(120));
        assert_eq!(resolved.backoff_unit, Duration::from_secs(1));
        assert_eq!(resolved.default_model, None);
    }

    #[test]
    fn fractional_seconds_keep_sub_second_precision() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"api_key": "test", "timeout": 1.5, "backoff_unit": 0.25}"#,
        )
        .expect("config");
        let resolved = config.resolve().expect("resolved");
        assert_eq!(resolved.timeout, Duration::from_millis(1500));
        assert_eq!(resolved.backoff_unit, Duration::from_millis(250));
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let result = serde_json::from_str::<ClientConfig>(r#"{"timeout": -1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn azure_endpoint_implies_default_model() {
        let config = ClientConfig {
            endpoint: "https://my-deployment.westeurope.inference.azure.com".to_string(),
            api_key: Some("test".to_string()),
            ..ClientConfig::default()
        };
        let resolved = config.resolve().expect("resolved");
        assert_eq!(resolved.default_model.as_deref(), Some("mistral"));
    }

    #[test]
    fn url_joins_with_single_slash() {
        let config = ClientConfig {
            endpoint: "https://api.mistral.ai/".to_string(),
            api_key: Some("test".to_string()),
            ..ClientConfig::default()
        };
        let resolved = config.resolve().expect("resolved");
        assert_eq!(
            resolved.url("/v1/chat/completions"),
            "https://api.mistral.ai/v1/chat/completions"
        );
        assert_eq!(resolved.url("v1/models"), "https://api.mistral.ai/v1/models");
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        if env::var(API_KEY_ENV).is_ok() {
            eprintln!("skip: {API_KEY_ENV} is set");
            return;
        }
        let err = ClientConfig::default().resolve().unwrap_err();
        assert!(matches!(err, MistralError::Configuration { .. }));
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn debug_redacts_api_key() {
        let resolved = ClientConfig {
            api_key: Some("secret-key".to_string()),
            ..ClientConfig::default()
        }
        .resolve()
        .expect("resolved");
        let debug = format!("{resolved:?}");
        assert!(!debug.contains("secret-key"));
    }
}
