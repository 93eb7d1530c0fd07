//! Rendering SDK failures as diagnostics

use std::error::Error;

use mgc_core::provider::{ProviderError, ProviderResult};
use mgc_sdk::{HttpError, RetryError, SdkError, ValidationError};

/// Classify an error into a (summary, detail) pair
///
/// Known SDK shapes get a dedicated summary; anything else becomes
/// "Unexpected error" with the error text as detail.
pub fn parse_sdk_error(err: &(dyn Error + 'static)) -> (String, String) {
    if let Some(sdk) = err.downcast_ref::<SdkError>() {
        match sdk {
            SdkError::Http(e) => return parse_sdk_error(e),
            SdkError::Validation(e) => return parse_sdk_error(e),
            SdkError::Retry(e) => return parse_sdk_error(e),
            _ => {}
        }
    }

    if let Some(e) = err.downcast_ref::<HttpError>() {
        return (
            "API request failed with HTTP error".to_string(),
            format!(
                "Status: {}, Body: {}, URL: {}, Request ID: {}",
                e.status, e.body, e.url, e.request_id
            ),
        );
    }

    if let Some(e) = err.downcast_ref::<ValidationError>() {
        return (
            "Request validation failed".to_string(),
            format!("Field: {}, Message: {}", e.field, e.message),
        );
    }

    if let Some(e) = err.downcast_ref::<RetryError>() {
        let (summary, detail) = parse_sdk_error(e.last_error.as_ref());
        return (
            format!("Request failed after {} retries", e.retries),
            format!("{}: {}", summary, detail),
        );
    }

    ("Unexpected error".to_string(), err.to_string())
}

/// Wrap an SDK failure into the error of the current operation
pub fn sdk_error(err: SdkError) -> ProviderError {
    let (summary, detail) = parse_sdk_error(&err);
    ProviderError::new(summary).with_detail(detail).with_cause(err)
}

/// `Ok(None)` when the API answered 404, otherwise the SDK result
pub fn found<T>(result: mgc_sdk::Result<T>) -> ProviderResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(sdk_error(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_404() -> HttpError {
        HttpError {
            status: "404 Not Found".to_string(),
            status_code: 404,
            body: "{\"message\":\"not found\"}".to_string(),
            url: "http://x".to_string(),
            request_id: "r1".to_string(),
        }
    }

    #[test]
    fn http_error_detail_is_ordered() {
        let (summary, detail) = parse_sdk_error(&http_404());
        assert_eq!(summary, "API request failed with HTTP error");

        let status = detail.find("404 Not Found").unwrap();
        let body = detail.find("not found\"}").unwrap();
        let url = detail.find("http://x").unwrap();
        let request_id = detail.find("r1").unwrap();
        assert!(status < body && body < url && url < request_id);
    }

    #[test]
    fn sdk_error_wrapper_is_unwrapped() {
        let err = SdkError::from(http_404());
        assert_eq!(parse_sdk_error(&err), parse_sdk_error(&http_404()));
    }

    #[test]
    fn validation_error() {
        let err = SdkError::validation("size", "must be positive");
        assert_eq!(
            parse_sdk_error(&err),
            (
                "Request validation failed".to_string(),
                "Field: size, Message: must be positive".to_string()
            )
        );
    }

    #[test]
    fn retry_error_renders_last_error() {
        let err = SdkError::from(RetryError {
            retries: 3,
            last_error: Box::new(SdkError::from(http_404())),
        });
        let (summary, detail) = parse_sdk_error(&err);
        assert_eq!(summary, "Request failed after 3 retries");
        assert!(detail.starts_with("API request failed with HTTP error: Status: 404 Not Found"));
    }

    #[test]
    fn unknown_error_falls_through() {
        let err = std::io::Error::other("socket closed");
        assert_eq!(
            parse_sdk_error(&err),
            ("Unexpected error".to_string(), "socket closed".to_string())
        );
    }

    #[test]
    fn found_maps_404_to_none() {
        let missing: mgc_sdk::Result<()> = Err(SdkError::from(http_404()));
        assert!(found(missing).unwrap().is_none());

        let invalid: mgc_sdk::Result<()> = Err(SdkError::validation("name", "empty"));
        let err = found(invalid).unwrap_err();
        assert_eq!(err.message, "Request validation failed");
    }
}
