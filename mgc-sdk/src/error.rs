//! SDK error types

use thiserror::Error;

/// Non-success HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTTP {status} from {url}")]
pub struct HttpError {
    /// Status line, e.g. "404 Not Found"
    pub status: String,
    pub status_code: u16,
    pub body: String,
    pub url: String,
    /// Value of the `x-request-id` response header, empty when absent
    pub request_id: String,
}

/// Request rejected before it was sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Retries exhausted; carries the error of the last attempt
#[derive(Debug, Error)]
#[error("request failed after {retries} retries: {last_error}")]
pub struct RetryError {
    pub retries: u32,
    pub last_error: Box<SdkError>,
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Retry(#[from] RetryError),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("object storage error: {0}")]
    ObjectStorage(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SdkError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError {
            field: field.into(),
            message: message.into(),
        })
    }

    /// HTTP status code of the failed response, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SdkError::Http(e) => Some(e.status_code),
            _ => None,
        }
    }

    /// True when the API answered 404
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> HttpError {
        HttpError {
            status: "404 Not Found".to_string(),
            status_code: 404,
            body: "{}".to_string(),
            url: "http://x/vpcs/1".to_string(),
            request_id: "r1".to_string(),
        }
    }

    #[test]
    fn not_found_detection() {
        assert!(SdkError::from(not_found()).is_not_found());
        assert!(!SdkError::validation("name", "empty").is_not_found());
    }

    #[test]
    fn retry_error_display_includes_last_error() {
        let err = SdkError::from(RetryError {
            retries: 3,
            last_error: Box::new(SdkError::from(not_found())),
        });
        assert_eq!(
            err.to_string(),
            "request failed after 3 retries: HTTP 404 Not Found from http://x/vpcs/1"
        );
        // A retried 404 is not a plain not-found answer
        assert!(!err.is_not_found());
    }
}
