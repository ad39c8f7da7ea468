//! The client for the study protocol backend. The backend owns the exact endpoint
//! shapes; the rest of the crate only needs the four abstract operations of the
//! `RemoteStore` trait, which also gives the session tests a seam to stand in a
//! scripted backend.
//!
//! Every call carries the session-scoped bearer token and the static API key
//! header, both taken from the configuration. Failures are surfaced as context
//! errors and never retried here: the caller decides whether to fall back to the
//! local cache (reads) or to let the user retry (writes).

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ContextError;
use crate::record::FormRecord;

/// The abstract operations the form sessions need from the backend.
pub trait RemoteStore {
    /// Resolves the currently active protocol version of a study and returns its
    /// numeric identifier, under which all content operations are keyed.
    fn activate_version(&self, study_code: &str) -> Result<u64, ContextError>;

    /// Fetches the stored record list of one form type under the given version.
    /// `None` means the backend holds no content yet for this form.
    fn fetch_content(
        &self,
        form_type: &str,
        version: u64,
    ) -> Result<Option<Vec<FormRecord>>, ContextError>;

    /// Persists the full record list of one form type under the given version.
    fn save_content(
        &self,
        form_type: &str,
        version: u64,
        records: &[FormRecord],
    ) -> Result<(), ContextError>;

    /// Creates a new protocol record for a study and returns its identifier.
    fn create_protocol(&self, study_code: &str) -> Result<u64, ContextError>;
}

#[derive(Debug, Deserialize)]
struct IdentifierResponse {
    id: u64,
}

#[derive(Debug, Deserialize, Serialize)]
struct ContentEnvelope {
    content: Vec<FormRecord>,
}

/// The HTTP implementation of `RemoteStore` against the JSON-over-HTTPS backend.
pub struct HttpRemoteStore {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    bearer_token: String,
}

impl HttpRemoteStore {
    pub fn new(config: &Config) -> Result<HttpRemoteStore, ContextError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_seconds))
            .build()
            .map_err(|error| {
                ContextError::with_error("Unable to build the HTTP client", &error)
            })?;

        Ok(HttpRemoteStore {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::blocking::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.bearer_token)
            .header("x-api-key", &self.api_key)
    }

    /// Converts a non-2xx response into a context error carrying the status code.
    fn check_status(
        response: reqwest::blocking::Response,
        context: &str,
    ) -> Result<reqwest::blocking::Response, ContextError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ContextError::with_context(format!(
                "{context}: the backend answered with status {status}"
            )))
        }
    }
}

impl RemoteStore for HttpRemoteStore {
    fn activate_version(&self, study_code: &str) -> Result<u64, ContextError> {
        let url = format!("{}/protocols/{}/versions/active", self.base_url, study_code);
        let response = self
            .request(reqwest::Method::POST, url)
            .send()
            .map_err(|error| {
                ContextError::with_error(
                    format!("Unable to activate a version for the study {:?}", study_code),
                    &error,
                )
            })?;
        let response = Self::check_status(
            response,
            &format!("Unable to activate a version for the study {:?}", study_code),
        )?;
        let identifier: IdentifierResponse = response.json().map_err(|error| {
            ContextError::with_error("Unable to parse the active version response", &error)
        })?;

        log::info!(
            "Activated version {} for the study {:?}",
            identifier.id,
            study_code
        );
        Ok(identifier.id)
    }

    fn fetch_content(
        &self,
        form_type: &str,
        version: u64,
    ) -> Result<Option<Vec<FormRecord>>, ContextError> {
        let url = format!("{}/versions/{}/documents/{}", self.base_url, version, form_type);
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .map_err(|error| {
                ContextError::with_error(
                    format!("Unable to fetch the content of the form {:?}", form_type),
                    &error,
                )
            })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check_status(
            response,
            &format!("Unable to fetch the content of the form {:?}", form_type),
        )?;
        let envelope: ContentEnvelope = response.json().map_err(|error| {
            ContextError::with_error(
                format!("Unable to parse the content of the form {:?}", form_type),
                &error,
            )
        })?;

        Ok(Some(envelope.content))
    }

    fn save_content(
        &self,
        form_type: &str,
        version: u64,
        records: &[FormRecord],
    ) -> Result<(), ContextError> {
        let url = format!("{}/versions/{}/documents/{}", self.base_url, version, form_type);
        let envelope = ContentEnvelope {
            content: records.to_vec(),
        };
        let response = self
            .request(reqwest::Method::PUT, url)
            .json(&envelope)
            .send()
            .map_err(|error| {
                ContextError::with_error(
                    format!("Unable to save the content of the form {:?}", form_type),
                    &error,
                )
            })?;
        Self::check_status(
            response,
            &format!("Unable to save the content of the form {:?}", form_type),
        )?;

        Ok(())
    }

    fn create_protocol(&self, study_code: &str) -> Result<u64, ContextError> {
        let url = format!("{}/protocols", self.base_url);
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&serde_json::json!({ "studyCode": study_code }))
            .send()
            .map_err(|error| {
                ContextError::with_error(
                    format!("Unable to create a protocol for the study {:?}", study_code),
                    &error,
                )
            })?;
        let response = Self::check_status(
            response,
            &format!("Unable to create a protocol for the study {:?}", study_code),
        )?;
        let identifier: IdentifierResponse = response.json().map_err(|error| {
            ContextError::with_error("Unable to parse the protocol creation response", &error)
        })?;

        Ok(identifier.id)
    }
}
