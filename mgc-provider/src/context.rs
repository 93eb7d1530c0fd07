//! Explicit provider context shared by every adapter
//!
//! The context is built once by [`crate::MgcProvider::configure`] and handed to
//! adapters as type-erased provider data. Adapters recover it through
//! [`ConfigureRequest::context`].

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use mgc_core::diagnostic::Diagnostic;
use mgc_sdk::{Client, ClientConfig, ObjectStorageClient, SdkError, region_to_url};

use crate::config::ProviderConfig;
use crate::tfutil::{WaitConfig, parse_sdk_error};

/// Provider data as passed to adapters
pub type ProviderData = Arc<dyn Any + Send + Sync>;

/// One configured set of clients, shared for a whole run
#[derive(Debug)]
pub struct ProviderContext {
    pub config: ProviderConfig,
    pub client: Client,
    /// Object storage client, or why buckets are unavailable in this run
    pub object_storage: Result<ObjectStorageClient, Diagnostic>,
    /// Polling used while waiting for resources to settle
    pub wait: WaitConfig,
    pub version: &'static str,
}

impl ProviderContext {
    /// Build the regional API client and, when keys are set, the object
    /// storage client
    ///
    /// Only the regional client can fail the run; an object storage failure
    /// is kept in `object_storage` and surfaces on bucket operations.
    pub async fn new(config: ProviderConfig) -> Result<Self, SdkError> {
        let version = env!("CARGO_PKG_VERSION");
        let base_url = config
            .server_url
            .clone()
            .unwrap_or_else(|| region_to_url(&config.region, &config.env));
        info!("configuring {} for {} ({})", base_url, config.region, config.env);

        let mut client_config = ClientConfig::new(base_url, config.api_key.clone())
            .with_user_agent(format!("mgc-provider/{}", version));
        if let Some(max_retries) = config.max_retries {
            let retries = u32::try_from(max_retries).unwrap_or(u32::MAX);
            client_config = client_config.with_retries(retries, Duration::from_millis(500));
        }
        let client = Client::new(client_config)?;

        let object_storage = object_storage_client(&config).await;
        if let Err(reason) = &object_storage {
            warn!("object storage unavailable: {}", reason);
        }

        Ok(Self {
            config,
            client,
            object_storage,
            wait: WaitConfig::default(),
            version,
        })
    }

    /// Object storage client, or the diagnostic explaining why there is none
    pub fn object_storage(&self) -> Result<&ObjectStorageClient, Diagnostic> {
        self.object_storage.as_ref().map_err(Clone::clone)
    }
}

/// Build the object storage client; failures only disable bucket operations
async fn object_storage_client(config: &ProviderConfig) -> Result<ObjectStorageClient, Diagnostic> {
    let Some((key_id, key_secret)) = config.object_storage_keys() else {
        return Err(Diagnostic::error(
            "Object Storage Not Configured",
            "Set the provider 'key_pair' block or MGC_OBJ_KEY_ID and MGC_OBJ_KEY_SECRET",
        ));
    };
    debug!("object storage key pair configured");
    ObjectStorageClient::new(&config.region, &config.env, key_id, key_secret)
        .await
        .map_err(|e| {
            let (_, detail) = parse_sdk_error(&e);
            Diagnostic::error("Object Storage Unavailable", detail)
        })
}

/// Configure handshake for an adapter
#[derive(Clone, Copy)]
pub enum ConfigureRequest<'a> {
    Resource { provider_data: Option<&'a ProviderData> },
    DataSource { provider_data: Option<&'a ProviderData> },
}

impl<'a> ConfigureRequest<'a> {
    pub fn resource(provider_data: &'a ProviderData) -> Self {
        ConfigureRequest::Resource {
            provider_data: Some(provider_data),
        }
    }

    pub fn data_source(provider_data: &'a ProviderData) -> Self {
        ConfigureRequest::DataSource {
            provider_data: Some(provider_data),
        }
    }

    /// Recover the shared context from the provider data
    pub fn context(&self) -> Result<Arc<ProviderContext>, Diagnostic> {
        let (provider_data, summary) = match *self {
            ConfigureRequest::Resource { provider_data } => {
                (provider_data, "Unexpected Resource Configure Type")
            }
            ConfigureRequest::DataSource { provider_data } => {
                (provider_data, "Unexpected Data Source Configure Type")
            }
        };

        let data = provider_data.ok_or_else(|| {
            Diagnostic::error(
                "Provider Not Configured",
                "The provider must be configured before resources or data sources are used",
            )
        })?;

        Arc::clone(data)
            .downcast::<ProviderContext>()
            .map_err(|_| {
                Diagnostic::error(
                    summary,
                    "Expected ProviderContext as provider data. Please report this issue to the provider developers.",
                )
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Context pointing at a test server, without object storage
    pub(crate) fn context_for(base_url: &str) -> Arc<ProviderContext> {
        let config = ProviderConfig {
            api_key: "test-key".into(),
            server_url: Some(base_url.to_string()),
            max_retries: Some(0),
            ..Default::default()
        };
        let client = Client::new(
            ClientConfig::new(base_url, "test-key").with_retries(0, Duration::from_millis(1)),
        )
        .unwrap();
        Arc::new(ProviderContext {
            config,
            client,
            object_storage: Err(Diagnostic::error("Object Storage Not Configured", "")),
            wait: WaitConfig {
                interval: Duration::from_millis(1),
                timeout: Duration::from_secs(2),
            },
            version: "test",
        })
    }

    #[test]
    fn recovers_context() {
        let data: ProviderData = context_for("http://localhost:1");
        let context = ConfigureRequest::resource(&data).context().unwrap();
        assert_eq!(context.version, "test");
    }

    #[test]
    fn wrong_type_is_a_diagnostic() {
        let data: ProviderData = Arc::new(42u32);

        let err = ConfigureRequest::resource(&data).context().unwrap_err();
        assert_eq!(err.summary, "Unexpected Resource Configure Type");
        assert!(err.is_error());

        let err = ConfigureRequest::data_source(&data).context().unwrap_err();
        assert_eq!(err.summary, "Unexpected Data Source Configure Type");
    }

    #[test]
    fn missing_data_is_a_diagnostic() {
        let err = ConfigureRequest::DataSource {
            provider_data: None,
        }
        .context()
        .unwrap_err();
        assert_eq!(err.summary, "Provider Not Configured");
    }

    #[test]
    fn object_storage_requires_keys() {
        let context = context_for("http://localhost:1");
        let err = context.object_storage().unwrap_err();
        assert_eq!(err.summary, "Object Storage Not Configured");
    }

    #[tokio::test]
    async fn server_url_overrides_region_table() {
        let config = ProviderConfig {
            api_key: "k".into(),
            region: "br-ne1".into(),
            server_url: Some("http://localhost:8080".into()),
            ..Default::default()
        };
        let context = ProviderContext::new(config).await.unwrap();
        assert_eq!(context.client.base_url(), "http://localhost:8080");
        assert!(context.object_storage.is_err());
    }

    #[tokio::test]
    async fn object_storage_failure_keeps_the_context() {
        let config = ProviderConfig {
            api_key: "k".into(),
            env: "dev-qa".into(),
            key_id: Some("id".into()),
            key_secret: Some("secret".into()),
            ..Default::default()
        };
        let context = ProviderContext::new(config).await.unwrap();
        assert_eq!(context.client.base_url(), "https://api.dev-qa.jaxyendy.com/br-se1");

        let err = context.object_storage().unwrap_err();
        assert_eq!(err.summary, "Object Storage Unavailable");
        assert!(err.detail.contains("dev-qa"));
    }

    #[tokio::test]
    async fn region_table_used_without_override() {
        let config = ProviderConfig {
            api_key: "k".into(),
            region: "br-ne1".into(),
            ..Default::default()
        };
        let context = ProviderContext::new(config).await.unwrap();
        assert_eq!(context.client.base_url(), "https://api.magalu.cloud/br-ne1");
    }
}
