//! Environment-driven configuration. The original data-entry screens shipped the
//! API key and the session token inside the client source; here every secret
//! comes from the environment at startup and is never compiled in.

use std::path::PathBuf;

use crate::error::ContextError;

#[derive(Debug, Clone)]
pub struct Config {
    /// The base URL of the study protocol backend.
    pub api_base_url: String,
    /// The static API key sent with every backend call.
    pub api_key: String,
    /// The session-scoped bearer token.
    pub bearer_token: String,
    /// The base URL of the postal code lookup service.
    pub lookup_base_url: String,
    /// The directory holding the local draft cache.
    pub cache_directory: PathBuf,
    /// The timeout applied to every HTTP request.
    pub http_timeout_seconds: u64,
}

impl Config {
    /// Loads the configuration from environment variables. The backend URL and the
    /// credentials have no sensible default and are required; the lookup service
    /// defaults to the public CEP service and the cache to a local directory.
    pub fn from_env() -> Result<Config, ContextError> {
        Ok(Config {
            api_base_url: required_env("FICHARIO_API_URL")?,
            api_key: required_env("FICHARIO_API_KEY")?,
            bearer_token: required_env("FICHARIO_TOKEN")?,
            lookup_base_url: std::env::var("FICHARIO_LOOKUP_URL")
                .unwrap_or_else(|_| "https://viacep.com.br/ws".to_string()),
            cache_directory: std::env::var("FICHARIO_CACHE_DIR")
                .unwrap_or_else(|_| ".fichario-cache".to_string())
                .into(),
            http_timeout_seconds: match std::env::var("FICHARIO_HTTP_TIMEOUT_SECONDS") {
                Ok(value) => value.parse().map_err(|error: std::num::ParseIntError| {
                    ContextError::with_error(
                        "Unable to parse FICHARIO_HTTP_TIMEOUT_SECONDS",
                        &error,
                    )
                })?,
                Err(_) => 30,
            },
        })
    }

    /// A configuration pointing nowhere, for tests that never reach the network.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Config {
        Config {
            api_base_url: "http://localhost:1".into(),
            api_key: "test-key".into(),
            bearer_token: "test-token".into(),
            lookup_base_url: "http://localhost:1".into(),
            cache_directory: ".fichario-cache".into(),
            http_timeout_seconds: 1,
        }
    }
}

fn required_env(name: &str) -> Result<String, ContextError> {
    std::env::var(name).map_err(|_| {
        ContextError::with_context(format!(
            "The environment variable {} is required but not set",
            name
        ))
    })
}
