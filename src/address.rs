//! The address lookup collaborator: given a postal code (CEP), it answers with
//! the street, district, city and region used to prefill the address sub-forms.
//! The service is a pure external lookup; an unknown postal code is a regular
//! `None` outcome, while transport failures surface as context errors.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ContextError;

/// The address fields the lookup service answers with.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "logradouro", default)]
    pub street: String,
    #[serde(rename = "bairro", default)]
    pub district: String,
    #[serde(rename = "localidade", default)]
    pub city: String,
    #[serde(rename = "uf", default)]
    pub region: String,
}

/// The not-found marker of the lookup service: a well-formed but unknown postal
/// code answers `200` with `{"erro": true}` instead of an HTTP error.
#[derive(Debug, Deserialize)]
struct LookupAnswer {
    #[serde(default)]
    erro: bool,
    #[serde(flatten)]
    address: Address,
}

pub struct AddressLookup {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl AddressLookup {
    pub fn new(config: &Config) -> Result<AddressLookup, ContextError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_seconds))
            .build()
            .map_err(|error| {
                ContextError::with_error("Unable to build the HTTP client", &error)
            })?;

        Ok(AddressLookup {
            client,
            base_url: config.lookup_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Looks up a postal code. `Ok(None)` means the service does not know it.
    pub fn lookup(&self, postal_code: &str) -> Result<Option<Address>, ContextError> {
        let digits: String = postal_code
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        if digits.len() != 8 {
            return Err(ContextError::with_context(format!(
                "The postal code {:?} is malformed, expected 8 digits",
                postal_code
            )));
        }

        let url = format!("{}/{}/json", self.base_url, digits);
        let response = self.client.get(url).send().map_err(|error| {
            ContextError::with_error(
                format!("Unable to look up the postal code {:?}", digits),
                &error,
            )
        })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ContextError::with_context(format!(
                "Unable to look up the postal code {:?}: the service answered with status {}",
                digits,
                response.status()
            )));
        }

        let answer: LookupAnswer = response.json().map_err(|error| {
            ContextError::with_error(
                format!("Unable to parse the lookup answer for {:?}", digits),
                &error,
            )
        })?;
        if answer.erro {
            return Ok(None);
        }
        Ok(Some(answer.address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_malformed_postal_code_is_rejected_before_any_request() {
        let config = Config {
            lookup_base_url: "http://localhost:1".into(),
            ..Config::for_tests()
        };
        let lookup = AddressLookup::new(&config).unwrap();
        assert!(lookup.lookup("1234").is_err());
        assert!(lookup.lookup("abcdefgh").is_err());
    }

    #[test]
    fn the_not_found_marker_deserializes_next_to_the_address_fields() {
        let answer: LookupAnswer = serde_json::from_str(r#"{"erro": true}"#).unwrap();
        assert!(answer.erro);

        let answer: LookupAnswer = serde_json::from_str(
            r#"{"logradouro": "Praça da Sé", "bairro": "Sé", "localidade": "São Paulo", "uf": "SP"}"#,
        )
        .unwrap();
        assert!(!answer.erro);
        assert_eq!(answer.address.city, "São Paulo");
        assert_eq!(answer.address.region, "SP");
    }
}
