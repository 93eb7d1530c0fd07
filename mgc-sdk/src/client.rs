//! Authenticated HTTP client shared by every service client

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{HttpError, Result, RetryError, SdkError};

const API_KEY_HEADER: &str = "x-api-key";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP client bound to one regional endpoint
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let (url, body) = self.execute(Method::GET, path, query, None).await?;
        decode(&url, &body)
    }

    /// GET returning the raw response body (e.g. a kubeconfig document)
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let (_, body) = self.execute(Method::GET, path, &[], None).await?;
        Ok(body)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(path, body)?;
        let (url, body) = self.execute(Method::POST, path, &[], Some(body)).await?;
        decode(&url, &body)
    }

    /// POST whose response body is ignored (actions such as attach or resize)
    pub async fn post_action<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let body = encode(path, body)?;
        self.execute(Method::POST, path, &[], Some(body)).await?;
        Ok(())
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let body = encode(path, body)?;
        self.execute(Method::PATCH, path, &[], Some(body)).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str, query: &[(&str, String)]) -> Result<()> {
        self.execute(Method::DELETE, path, query, None).await?;
        Ok(())
    }

    /// Send a request, retrying throttled and unavailable responses
    ///
    /// Returns the final URL and the response body.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<(String, String)> {
        let url = self.url(path);
        let mut attempt: u32 = 0;

        loop {
            debug!("{} {}", method, url);

            let mut request = self
                .http
                .request(method.clone(), &url)
                .header(API_KEY_HEADER, &self.config.api_key)
                .query(query);
            if let Some(ref body) = body {
                request = request.json(body);
            }

            let error = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let request_id = response
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let final_url = response.url().to_string();
                    let text = response.text().await?;

                    if status.is_success() {
                        return Ok((final_url, text));
                    }
                    SdkError::Http(HttpError {
                        status: status.to_string(),
                        status_code: status.as_u16(),
                        body: text,
                        url: final_url,
                        request_id,
                    })
                }
                Err(e) => SdkError::Transport(e),
            };

            if !is_retryable(&error) {
                return Err(error);
            }
            if attempt >= self.config.max_retries {
                if attempt == 0 {
                    return Err(error);
                }
                return Err(RetryError {
                    retries: attempt,
                    last_error: Box::new(error),
                }
                .into());
            }

            attempt += 1;
            warn!(
                "{} {} failed: {} (retry {}/{})",
                method, url, error, attempt, self.config.max_retries
            );
            tokio::time::sleep(self.config.retry_delay * attempt).await;
        }
    }
}

fn is_retryable(error: &SdkError) -> bool {
    match error {
        SdkError::Http(e) => matches!(
            StatusCode::from_u16(e.status_code),
            Ok(StatusCode::TOO_MANY_REQUESTS
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT)
        ),
        SdkError::Transport(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}

fn encode<B: Serialize + ?Sized>(path: &str, body: &B) -> Result<serde_json::Value> {
    serde_json::to_value(body).map_err(|source| SdkError::Decode {
        url: path.to_string(),
        source,
    })
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| SdkError::Decode {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    fn client(server: &MockServer, max_retries: u32) -> Client {
        let config = ClientConfig::new(server.uri(), "secret")
            .with_retries(max_retries, Duration::from_millis(1));
        Client::new(config).unwrap()
    }

    #[tokio::test]
    async fn get_sends_api_key_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/network/v0/vpcs/abc"))
            .and(header("x-api-key", "secret"))
            .and(query_param("expand", "subnets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "abc"})))
            .expect(1)
            .mount(&server)
            .await;

        let item: Item = client(&server, 0)
            .get("/network/v0/vpcs/abc", &[("expand", "subnets".to_string())])
            .await
            .unwrap();
        assert_eq!(item, Item { id: "abc".into() });
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/network/v0/vpcs"))
            .and(body_json(serde_json::json!({"name": "main"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "v1"})))
            .mount(&server)
            .await;

        let item: Item = client(&server, 0)
            .post("network/v0/vpcs", &serde_json::json!({"name": "main"}))
            .await
            .unwrap();
        assert_eq!(item.id, "v1");
    }

    #[tokio::test]
    async fn error_response_becomes_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/compute/v1/instances/missing"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("x-request-id", "req-42")
                    .set_body_string("instance not found"),
            )
            .mount(&server)
            .await;

        let err = client(&server, 3)
            .get::<Item>("compute/v1/instances/missing", &[])
            .await
            .unwrap_err();

        let SdkError::Http(http) = err else {
            panic!("expected HTTP error, got {err:?}");
        };
        assert_eq!(http.status, "404 Not Found");
        assert_eq!(http.status_code, 404);
        assert_eq!(http.body, "instance not found");
        assert_eq!(http.request_id, "req-42");
        assert!(http.url.ends_with("/compute/v1/instances/missing"));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/network/v0/vpcs/v1"))
            .respond_with(ResponseTemplate::new(400).set_body_string("in use"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 3)
            .delete("network/v0/vpcs/v1", &[])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(400));
    }

    #[tokio::test]
    async fn unavailable_is_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kubernetes/v0/versions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/kubernetes/v0/versions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "ok"})))
            .mount(&server)
            .await;

        let item: Item = client(&server, 3)
            .get("kubernetes/v0/versions", &[])
            .await
            .unwrap();
        assert_eq!(item.id, "ok");
    }

    #[tokio::test]
    async fn exhausted_retries_wrap_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/database/v2/engines"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server, 2)
            .get::<Item>("database/v2/engines", &[])
            .await
            .unwrap_err();

        let SdkError::Retry(retry) = err else {
            panic!("expected retry error, got {err:?}");
        };
        assert_eq!(retry.retries, 2);
        assert_eq!(retry.last_error.status_code(), Some(503));
    }

    #[tokio::test]
    async fn undecodable_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/container-registry/v0/credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server, 0)
            .get::<Item>("container-registry/v0/credentials", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Decode { .. }));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let config = ClientConfig::new("https://api.magalu.cloud/br-se1/", "k");
        let client = Client::new(config).unwrap();
        assert_eq!(
            client.url("/compute/v1/instances"),
            "https://api.magalu.cloud/br-se1/compute/v1/instances"
        );
    }
}
