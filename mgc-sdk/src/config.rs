//! Endpoint resolution and client configuration
//!
//! Regional API endpoints silently fall back: an unknown environment is
//! resolved as `prod`, and an unknown region as `br-se1`. Object storage is
//! stricter and refuses the `dev-qa` environment outright.

use std::time::Duration;

use crate::error::SdkError;

pub const DEFAULT_REGION: &str = "br-se1";
pub const DEFAULT_ENV: &str = "prod";

/// Environment without object storage endpoints
const OBJECT_STORAGE_UNSUPPORTED_ENV: &str = "dev-qa";

type RegionTable = &'static [(&'static str, &'static str)];

const API_URLS: &[(&str, RegionTable)] = &[
    (
        "prod",
        &[
            ("br-se1", "https://api.magalu.cloud/br-se1"),
            ("br-ne1", "https://api.magalu.cloud/br-ne1"),
            ("br-mgl1", "https://api.magalu.cloud/br-mgl1"),
        ],
    ),
    (
        "pre-prod",
        &[
            ("br-se1", "https://api.pre-prod.jaxyendy.com/br-se1"),
            ("br-ne1", "https://api.pre-prod.jaxyendy.com/br-ne1"),
            ("br-mgl1", "https://api.pre-prod.jaxyendy.com/br-mgl1"),
        ],
    ),
    (
        "dev-qa",
        &[
            ("br-se1", "https://api.dev-qa.jaxyendy.com/br-se1"),
            ("br-ne1", "https://api.dev-qa.jaxyendy.com/br-ne1"),
            ("br-mgl1", "https://api.dev-qa.jaxyendy.com/br-mgl1"),
        ],
    ),
];

const S3_HOSTS: &[(&str, RegionTable)] = &[
    (
        "prod",
        &[
            ("br-se1", "br-se1.magaluobjects.com"),
            ("br-ne1", "br-ne1.magaluobjects.com"),
            ("br-mgl1", "br-mgl1.magaluobjects.com"),
        ],
    ),
    (
        "pre-prod",
        &[
            ("br-se1", "br-se1.pre-prod.jaxyendy.com"),
            ("br-ne1", "br-ne1.pre-prod.jaxyendy.com"),
            ("br-mgl1", "br-mgl1.pre-prod.jaxyendy.com"),
        ],
    ),
];

fn table_for(tables: &[(&str, RegionTable)], env: &str) -> RegionTable {
    tables
        .iter()
        .find(|(name, _)| *name == env)
        .or_else(|| tables.iter().find(|(name, _)| *name == DEFAULT_ENV))
        .map(|(_, table)| *table)
        .unwrap_or(&[])
}

fn lookup(table: RegionTable, region: &str) -> &'static str {
    table
        .iter()
        .find(|(name, _)| *name == region)
        .or_else(|| table.iter().find(|(name, _)| *name == DEFAULT_REGION))
        .map(|(_, url)| *url)
        .unwrap_or_default()
}

/// Resolve the API base URL for a region in an environment
///
/// Never fails: unknown environments resolve as `prod` and unknown regions
/// as `br-se1`.
pub fn region_to_url(region: &str, env: &str) -> String {
    lookup(table_for(API_URLS, env), region).to_string()
}

/// Resolve the S3-compatible host for a region in an environment
pub fn region_to_s3_url(region: &str, env: &str) -> Result<String, SdkError> {
    if env == OBJECT_STORAGE_UNSUPPORTED_ENV {
        return Err(SdkError::configuration(format!(
            "object storage is not available in the '{}' environment",
            env
        )));
    }
    Ok(lookup(table_for(S3_HOSTS, env), region).to_string())
}

/// Configuration of the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Regional base URL, e.g. `https://api.magalu.cloud/br-se1`
    pub base_url: String,
    pub api_key: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; grows linearly per attempt
    pub retry_delay: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            user_agent: format!("mgc-sdk/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Configuration for a region, honouring the environment tables
    pub fn for_region(region: &str, env: &str, api_key: impl Into<String>) -> Self {
        Self::new(region_to_url(region, env), api_key)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}
