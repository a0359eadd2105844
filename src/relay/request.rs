//! Inbound relay request parsing and validation.
//!
//! The wire body mirrors what existing clients already send:
//!
//! ```json
//! {
//!   "url": "https://esi.example/v1/status/",
//!   "method": "GET",
//!   "body": "<base64>",
//!   "max_wait": 5000000000,
//!   "access_token": "…",
//!   "etag": "\"abc\"",
//!   "descriptor": "killmail-importer"
//! }
//! ```
//!
//! Every field is optional on the wire; empty strings mean "absent".
//! `max_wait` is in nanoseconds.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

/// Raw JSON body of an inbound relay call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayRequestBody {
    pub url: String,
    pub method: String,
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,
    pub max_wait: i64,
    pub access_token: String,
    pub etag: String,
    pub descriptor: String,
}

/// A validated relay request.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub url: Url,
    /// Always GET or POST.
    pub method: Method,
    pub body: Bytes,
    /// Accepted for compatibility; not enforced.
    pub wait_budget: Duration,
    pub access_token: Option<String>,
    /// Conditional-request token, sent upstream as `If-None-Match`.
    pub validator: Option<String>,
    pub descriptor: Option<String>,
}

/// Client input that is rejected before any upstream work.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("invalid URL supplied: {0}")]
    InvalidUrl(String),

    #[error("only GET and POST requests are accepted, got '{0}'")]
    UnsupportedMethod(String),

    #[error("{0} cannot be sent as an HTTP header value")]
    InvalidHeader(&'static str),
}

impl RelayRequest {
    /// Parse and validate a JSON request body.
    pub fn from_json(bytes: &[u8]) -> Result<Self, RequestError> {
        let body: RelayRequestBody = serde_json::from_slice(bytes)?;
        Self::try_from(body)
    }
}

impl TryFrom<RelayRequestBody> for RelayRequest {
    type Error = RequestError;

    fn try_from(body: RelayRequestBody) -> Result<Self, Self::Error> {
        let url = Url::parse(&body.url)
            .map_err(|e| RequestError::InvalidUrl(format!("'{}': {}", body.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RequestError::InvalidUrl(format!(
                "'{}': unsupported scheme '{}'",
                body.url,
                url.scheme()
            )));
        }

        let method = match body.method.as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            other => return Err(RequestError::UnsupportedMethod(other.to_string())),
        };

        Ok(Self {
            url,
            method,
            body: Bytes::from(body.body),
            wait_budget: Duration::from_nanos(body.max_wait.max(0) as u64),
            access_token: non_empty(body.access_token),
            validator: non_empty(body.etag),
            descriptor: non_empty(body.descriptor),
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Byte fields travel as standard base64; `null` decodes to empty.
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD.decode(encoded.as_bytes()).map_err(de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_full_body() {
        let request = RelayRequest::from_json(
            br#"{
                "url": "https://esi.example/v1/status/?datasource=tranquility",
                "method": "POST",
                "body": "aGVsbG8=",
                "max_wait": 5000000000,
                "access_token": "tok",
                "etag": "\"abc\"",
                "descriptor": "importer"
            }"#,
        )
        .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url.host_str(), Some("esi.example"));
        assert_eq!(request.body, Bytes::from_static(b"hello"));
        assert_eq!(request.wait_budget, Duration::from_secs(5));
        assert_eq!(request.access_token.as_deref(), Some("tok"));
        assert_eq!(request.validator.as_deref(), Some("\"abc\""));
        assert_eq!(request.descriptor.as_deref(), Some("importer"));
    }

    #[test]
    fn test_missing_optionals_are_absent() {
        let request =
            RelayRequest::from_json(br#"{"url": "https://esi.example/", "method": "GET", "body": null}"#)
                .unwrap();

        assert!(request.body.is_empty());
        assert_eq!(request.wait_budget, Duration::ZERO);
        assert!(request.access_token.is_none());
        assert!(request.validator.is_none());
        assert!(request.descriptor.is_none());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            RelayRequest::from_json(b"{not json"),
            Err(RequestError::MalformedBody(_))
        ));
        assert!(matches!(
            RelayRequest::from_json(br#"{"url": "https://e/", "method": "GET", "body": "%%%"}"#),
            Err(RequestError::MalformedBody(_))
        ));
    }

    #[test]
    fn test_rejects_unparsable_and_relative_urls() {
        for url in ["", "not a url", "/v1/status/", "ftp://esi.example/file"] {
            let body = RelayRequestBody {
                url: url.to_string(),
                method: "GET".into(),
                ..Default::default()
            };
            assert!(
                matches!(RelayRequest::try_from(body), Err(RequestError::InvalidUrl(_))),
                "{url:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_other_methods() {
        for method in ["PUT", "DELETE", "get", ""] {
            let body = RelayRequestBody {
                url: "https://esi.example/".into(),
                method: method.to_string(),
                ..Default::default()
            };
            assert!(matches!(
                RelayRequest::try_from(body),
                Err(RequestError::UnsupportedMethod(_))
            ));
        }
    }

    #[test]
    fn test_body_serializes_as_base64() {
        let body = RelayRequestBody {
            url: "https://esi.example/".into(),
            method: "POST".into(),
            body: b"[1,2,3]".to_vec(),
            ..Default::default()
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["body"], "WzEsMiwzXQ==");
    }
}
