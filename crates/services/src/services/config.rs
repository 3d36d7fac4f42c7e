//! Runtime configuration read from the process environment.

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/preproduction.db";
pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1";
pub const DEFAULT_FAST_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_PRO_MODEL: &str = "google/gemini-2.5-pro";
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-2.5-flash-image-preview";
pub const DEFAULT_CURRENCY: &str = "BRL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Model names used for each kind of request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSet {
    pub fast: String,
    pub pro: String,
    pub image: String,
}

impl Default for ModelSet {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST_MODEL.to_string(),
            pro: DEFAULT_PRO_MODEL.to_string(),
            image: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub gateway_url: String,
    /// Absent keys are tolerated at startup; generation requests fail instead.
    pub gateway_api_key: Option<SecretString>,
    pub models: ModelSet,
    pub jwt_secret: SecretString,
    pub budget_currency: String,
    /// Language of the generated text, e.g. `Brazilian Portuguese`; unset
    /// leaves it to the prompts (English).
    pub output_language: Option<String>,
    pub cors_allow_origin: Option<String>,
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let or_default = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let host = or_default("HOST", "127.0.0.1");
        let host = host.parse::<IpAddr>().map_err(|_| ConfigError::Invalid {
            name: "HOST",
            value: host.clone(),
        })?;
        let port = or_default("PORT", "3001");
        let port = port.parse::<u16>().map_err(|_| ConfigError::Invalid {
            name: "PORT",
            value: port.clone(),
        })?;

        let jwt_secret = var("AUTH_JWT_SECRET").ok_or(ConfigError::Missing("AUTH_JWT_SECRET"))?;

        Ok(Self {
            database_url: or_default("DATABASE_URL", DEFAULT_DATABASE_URL),
            host,
            port,
            gateway_url: or_default("AI_GATEWAY_URL", DEFAULT_GATEWAY_URL)
                .trim_end_matches('/')
                .to_string(),
            gateway_api_key: var("AI_GATEWAY_API_KEY").map(SecretString::from),
            models: ModelSet {
                fast: or_default("AI_FAST_MODEL", DEFAULT_FAST_MODEL),
                pro: or_default("AI_PRO_MODEL", DEFAULT_PRO_MODEL),
                image: or_default("AI_IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
            },
            jwt_secret: SecretString::from(jwt_secret),
            budget_currency: or_default("BUDGET_CURRENCY", DEFAULT_CURRENCY),
            output_language: var("GENERATION_LANGUAGE").map(|v| v.trim().to_string()),
            cors_allow_origin: var("CORS_ALLOW_ORIGIN"),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Configuration for tests and local tooling: no gateway key, fixed secret.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            gateway_api_key: None,
            models: ModelSet::default(),
            jwt_secret: SecretString::from(jwt_secret.to_string()),
            budget_currency: DEFAULT_CURRENCY.to_string(),
            output_language: None,
            cors_allow_origin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let config = Config::from_lookup(lookup(&[("AUTH_JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:3001");
        assert_eq!(config.models, ModelSet::default());
        assert_eq!(config.budget_currency, "BRL");
        assert_eq!(config.output_language, None);
        assert!(config.gateway_api_key.is_none());
        assert_eq!(config.jwt_secret.expose_secret(), "s3cret");
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("AUTH_JWT_SECRET")));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[("AUTH_JWT_SECRET", "x"), ("PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn gateway_url_loses_trailing_slash() {
        let config = Config::from_lookup(lookup(&[
            ("AUTH_JWT_SECRET", "x"),
            ("AI_GATEWAY_URL", "http://localhost:9000/v1/"),
            ("AI_GATEWAY_API_KEY", "key"),
        ]))
        .unwrap();
        assert_eq!(config.gateway_url, "http://localhost:9000/v1");
        assert!(config.gateway_api_key.is_some());
    }

    #[test]
    fn generation_language_is_optional() {
        let config = Config::from_lookup(lookup(&[
            ("AUTH_JWT_SECRET", "x"),
            ("GENERATION_LANGUAGE", " Brazilian Portuguese "),
        ]))
        .unwrap();
        assert_eq!(config.output_language.as_deref(), Some("Brazilian Portuguese"));
    }
}
