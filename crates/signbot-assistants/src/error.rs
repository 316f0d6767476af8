//! Error types for signbot-assistants

use thiserror::Error;

/// Result type alias using signbot-assistants Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the assistants platform
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Rate limit or quota exceeded
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status and its body to an error.
    ///
    /// The platform wraps failures as `{"error": {"type": ..., "message": ...}}`;
    /// bodies that don't match are passed through verbatim.
    pub fn from_status(status: u16, body: &str, retry_after: Option<u64>) -> Self {
        if status == 429 {
            return Error::RateLimited { retry_after };
        }

        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();

        if status == 401 || status == 403 {
            let message = parsed
                .map(|e| e.error.message)
                .unwrap_or_else(|| body.to_string());
            return Error::Auth(message);
        }

        match parsed {
            Some(envelope) => Error::Api {
                error_type: envelope
                    .error
                    .error_type
                    .unwrap_or_else(|| format!("http_{}", status)),
                message: envelope.error.message,
            },
            None => Error::api(format!("http_{}", status), body.to_string()),
        }
    }

    /// Whether the failure was caused by credentials rather than the request
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }
}

#[derive(Debug, serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_rate_limited() {
        let e = Error::from_status(429, "{}", Some(12));
        assert!(matches!(e, Error::RateLimited { retry_after: Some(12) }));
    }

    #[test]
    fn test_from_status_auth_uses_message() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"Incorrect API key provided"}}"#;
        let e = Error::from_status(401, body, None);
        match e {
            Error::Auth(msg) => assert_eq!(msg, "Incorrect API key provided"),
            other => panic!("expected Auth, got {:?}", other),
        }
    }

    #[test]
    fn test_from_status_api_envelope() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"No thread found with id 'thread_x'."}}"#;
        let e = Error::from_status(404, body, None);
        match e {
            Error::Api {
                error_type,
                message,
            } => {
                assert_eq!(error_type, "invalid_request_error");
                assert!(message.contains("thread_x"));
            }
            other => panic!("expected Api, got {:?}", other),
        }
    }

    #[test]
    fn test_from_status_plain_body() {
        let e = Error::from_status(502, "Bad Gateway", None);
        assert_eq!(e.to_string(), "API error: Bad Gateway (type: http_502)");
    }

    #[test]
    fn test_is_auth() {
        assert!(Error::from_status(401, "", None).is_auth());
        assert!(Error::Auth("nope".into()).is_auth());
        assert!(!Error::Sse("reset".into()).is_auth());
    }
}
