//! S3-compatible object storage client
//!
//! Buckets are managed through `aws-sdk-s3` pointed at the regional object
//! storage host with path-style addressing and the tenant's static key pair.

use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::DateTimeFormat;
use aws_sdk_s3::types::{BucketVersioningStatus, VersioningConfiguration};
use log::debug;
use url::Url;

use crate::config::region_to_s3_url;
use crate::error::{HttpError, Result, SdkError};

const REQUEST_ID_HEADER: &str = "x-amz-request-id";
const CREDENTIALS_PROVIDER: &str = "mgc-static";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub name: String,
    /// RFC 3339 creation time, when reported
    pub creation_date: Option<String>,
}

/// Object storage client bound to one regional endpoint
#[derive(Debug, Clone)]
pub struct ObjectStorageClient {
    s3: aws_sdk_s3::Client,
    endpoint: Url,
}

/// `https://` URL for an object storage host
pub fn endpoint_for(region: &str, env: &str) -> Result<Url> {
    let host = region_to_s3_url(region, env)?;
    parse_endpoint(&format!("https://{}", host))
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    Url::parse(endpoint).map_err(|e| {
        SdkError::configuration(format!("invalid object storage endpoint '{}': {}", endpoint, e))
    })
}

impl ObjectStorageClient {
    /// Client for the object storage host of a region and environment
    pub async fn new(region: &str, env: &str, key_id: &str, key_secret: &str) -> Result<Self> {
        let endpoint = endpoint_for(region, env)?;
        Ok(Self::build(endpoint, region, key_id, key_secret).await)
    }

    /// Client for an explicit endpoint, e.g. a local S3 emulator
    pub async fn with_endpoint(
        endpoint: &str,
        region: &str,
        key_id: &str,
        key_secret: &str,
    ) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        Ok(Self::build(endpoint, region, key_id, key_secret).await)
    }

    async fn build(endpoint: Url, region: &str, key_id: &str, key_secret: &str) -> Self {
        debug!("object storage endpoint {}", endpoint);
        let credentials = Credentials::new(key_id, key_secret, None, None, CREDENTIALS_PROVIDER);
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint.as_str())
            .credentials_provider(credentials)
            .load()
            .await;
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        Self {
            s3: aws_sdk_s3::Client::from_conf(config),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn bucket_url(&self, bucket: &str) -> String {
        format!("{}{}", self.endpoint, bucket)
    }

    pub async fn create_bucket(&self, bucket: &str) -> Result<()> {
        validate_bucket_name(bucket)?;
        self.s3
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| s3_error(e, self.bucket_url(bucket)))?;
        Ok(())
    }

    /// True when the bucket exists and is reachable with these credentials
    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.s3.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = s3_error(err, self.bucket_url(bucket));
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    pub async fn versioning_enabled(&self, bucket: &str) -> Result<bool> {
        let output = self
            .s3
            .get_bucket_versioning()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| s3_error(e, self.bucket_url(bucket)))?;
        Ok(matches!(
            output.status(),
            Some(BucketVersioningStatus::Enabled)
        ))
    }

    pub async fn set_versioning(&self, bucket: &str, enabled: bool) -> Result<()> {
        let status = if enabled {
            BucketVersioningStatus::Enabled
        } else {
            BucketVersioningStatus::Suspended
        };
        self.s3
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(VersioningConfiguration::builder().status(status).build())
            .send()
            .await
            .map_err(|e| s3_error(e, self.bucket_url(bucket)))?;
        Ok(())
    }

    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let output = self
            .s3
            .list_buckets()
            .send()
            .await
            .map_err(|e| s3_error(e, self.endpoint.to_string()))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| {
                Some(Bucket {
                    name: b.name()?.to_string(),
                    creation_date: b
                        .creation_date()
                        .and_then(|d| d.fmt(DateTimeFormat::DateTime).ok()),
                })
            })
            .collect())
    }

    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.s3
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| s3_error(e, self.bucket_url(bucket)))?;
        Ok(())
    }
}

/// S3 bucket naming rules: 3 to 63 lowercase letters, digits, `-` or `.`,
/// starting and ending with a letter or digit
pub fn validate_bucket_name(name: &str) -> Result<()> {
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let chars_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    if !(3..=63).contains(&name.len())
        || !chars_ok
        || !edge_ok(name.chars().next())
        || !edge_ok(name.chars().last())
        || name.contains("..")
    {
        return Err(SdkError::validation(
            "bucket",
            format!("'{}' is not a valid bucket name", name),
        ));
    }
    Ok(())
}

/// Map an S3 failure onto the SDK taxonomy; responses become [`HttpError`]
fn s3_error<E>(err: aws_sdk_s3::error::SdkError<E>, url: String) -> SdkError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let body = DisplayErrorContext(&err).to_string();
    match err.raw_response() {
        Some(raw) => {
            let status_code = raw.status().as_u16();
            let status = reqwest::StatusCode::from_u16(status_code)
                .map(|s| s.to_string())
                .unwrap_or_else(|_| status_code.to_string());
            SdkError::Http(HttpError {
                status,
                status_code,
                body,
                url,
                request_id: raw
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .unwrap_or_default()
                    .to_string(),
            })
        }
        None => SdkError::ObjectStorage(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uses_https_host() {
        let url = endpoint_for("br-ne1", "prod").unwrap();
        assert_eq!(url.as_str(), "https://br-ne1.magaluobjects.com/");
    }

    #[test]
    fn endpoint_rejects_dev_qa() {
        assert!(matches!(
            endpoint_for("br-se1", "dev-qa"),
            Err(SdkError::Configuration(_))
        ));
    }

    #[test]
    fn bucket_names() {
        assert!(validate_bucket_name("my-bucket.logs").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("Upper").is_err());
        assert!(validate_bucket_name("-start").is_err());
        assert!(validate_bucket_name("end-").is_err());
        assert!(validate_bucket_name("a..b").is_err());
    }

    #[tokio::test]
    async fn explicit_endpoint_is_kept() {
        let client = ObjectStorageClient::with_endpoint("http://localhost:9000", "br-se1", "id", "secret")
            .await
            .unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:9000/");
        assert_eq!(client.bucket_url("logs"), "http://localhost:9000/logs");
    }
}
