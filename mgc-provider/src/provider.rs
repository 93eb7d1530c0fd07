//! Magalu Cloud Provider
//!
//! Dispatches engine calls to the registered adapters. Each call binds a
//! fresh adapter to the shared context, validates the declared attributes
//! against the adapter schema and maps the adapter result into `State`.

use std::sync::Arc;

use log::{debug, warn};
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult, ResourceType};
use mgc_core::resource::{Attributes, Resource, ResourceId, State};
use mgc_core::schema::ResourceSchema;

use crate::adapter::{DataSourceAdapter, DataSourceEntry, ResourceAdapter, ResourceEntry};
use crate::config::{PROVIDER_NAME, ProviderConfig, env_lookup};
use crate::context::{ConfigureRequest, ProviderContext, ProviderData};
use crate::data_sources::data_source_entries;
use crate::resources::resource_entries;
use crate::tfutil::{ConfigValue, parse_sdk_error};

pub struct MgcProvider {
    data: ProviderData,
    resources: Vec<ResourceEntry>,
    data_sources: Vec<DataSourceEntry>,
}

impl MgcProvider {
    /// Resolve the configuration and build the shared context
    ///
    /// Returns the provider along with non-fatal warnings.
    pub async fn configure(explicit: &Attributes) -> Result<(Self, Vec<Diagnostic>), Diagnostic> {
        Self::configure_with(explicit, &env_lookup).await
    }

    /// Same as [`MgcProvider::configure`] with an arbitrary environment lookup
    pub async fn configure_with(
        explicit: &Attributes,
        env: &dyn Fn(&str) -> Option<ConfigValue>,
    ) -> Result<(Self, Vec<Diagnostic>), Diagnostic> {
        let config = ProviderConfig::resolve_with(explicit, env)?;
        let context = ProviderContext::new(config).await.map_err(|e| {
            let (summary, detail) = parse_sdk_error(&e);
            Diagnostic::error(summary, detail)
        })?;

        let mut warnings = Vec::new();
        if let Err(reason) = &context.object_storage {
            warn!("bucket operations are disabled: {}", reason);
            warnings.push(Diagnostic::warning(
                "Object Storage Disabled",
                format!(
                    "mgc_object_storage_buckets will fail until this is resolved. {}",
                    reason
                ),
            ));
        }
        Ok((Self::from_data(Arc::new(context)), warnings))
    }

    /// Provider over already-built provider data
    pub fn from_data(data: ProviderData) -> Self {
        Self {
            data,
            resources: resource_entries(),
            data_sources: data_source_entries(),
        }
    }

    fn bind_resource(
        &self,
        id: &ResourceId,
    ) -> ProviderResult<(ResourceSchema, Box<dyn ResourceAdapter>)> {
        let entry = self
            .resources
            .iter()
            .find(|e| e.type_name == id.resource_type)
            .ok_or_else(|| {
                ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
                    .for_resource(id.clone())
            })?;
        let adapter = entry
            .configure(ConfigureRequest::resource(&self.data))
            .map_err(|d| ProviderError::from(d).for_resource(id.clone()))?;
        Ok((entry.schema(), adapter))
    }

    fn bind_data_source(
        &self,
        id: &ResourceId,
    ) -> ProviderResult<(ResourceSchema, Box<dyn DataSourceAdapter>)> {
        let entry = self
            .data_sources
            .iter()
            .find(|e| e.type_name == id.resource_type)
            .ok_or_else(|| {
                ProviderError::new(format!("Unknown data source type: {}", id.resource_type))
                    .for_resource(id.clone())
            })?;
        let adapter = entry
            .configure(ConfigureRequest::data_source(&self.data))
            .map_err(|d| ProviderError::from(d).for_resource(id.clone()))?;
        Ok((entry.schema(), adapter))
    }
}

/// Check declared attributes against the schema
fn validate(schema: &ResourceSchema, resource: &Resource) -> ProviderResult<()> {
    schema.validate(&resource.attributes).map_err(|errors| {
        let detail = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        ProviderError::new("Invalid configuration")
            .with_detail(detail)
            .for_resource(resource.id.clone())
    })
}

impl Provider for MgcProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        self.resources
            .iter()
            .map(|e| Box::new(*e) as Box<dyn ResourceType>)
            .collect()
    }

    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        self.data_sources
            .iter()
            .map(|e| Box::new(*e) as Box<dyn ResourceType>)
            .collect()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(str::to_string);
        Box::pin(async move {
            let Some(identifier) = identifier else {
                return Ok(State::not_found(id));
            };
            let (_, adapter) = self.bind_resource(&id)?;
            match adapter
                .read(&identifier)
                .await
                .map_err(|e| e.for_resource(id.clone()))?
            {
                Some(attrs) => Ok(State::existing(id, attrs).with_identifier(identifier)),
                None => {
                    debug!("{} ({}) no longer exists", id, identifier);
                    Ok(State::not_found(id))
                }
            }
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            let (schema, adapter) = self.bind_resource(&resource.id)?;
            validate(&schema, &resource)?;
            let (identifier, attrs) = adapter
                .create(&resource.attributes)
                .await
                .map_err(|e| e.for_resource(resource.id.clone()))?;
            Ok(State::existing(resource.id, attrs).with_identifier(identifier))
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.attributes.clone();
        let to = to.clone();
        Box::pin(async move {
            let (schema, adapter) = self.bind_resource(&id)?;
            validate(&schema, &to)?;
            let attrs = adapter
                .update(&identifier, &from, &to.attributes)
                .await
                .map_err(|e| e.for_resource(id.clone()))?;
            Ok(State::existing(id, attrs).with_identifier(identifier))
        })
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        state: &State,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let attrs = state.attributes.clone();
        Box::pin(async move {
            let (_, adapter) = self.bind_resource(&id)?;
            adapter
                .delete(&identifier, &attrs)
                .await
                .map_err(|e| e.for_resource(id))
        })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            let (schema, adapter) = self.bind_data_source(&resource.id)?;
            validate(&schema, &resource)?;
            let attrs = adapter
                .read(&resource.attributes)
                .await
                .map_err(|e| e.for_resource(resource.id.clone()))?;
            Ok(State::existing(resource.id, attrs))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context_for;
    use mgc_core::resource::Value;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> MgcProvider {
        MgcProvider::from_data(context_for(&server.uri()))
    }

    fn vpc_body() -> serde_json::Value {
        json!({
            "id": "vpc-1",
            "name": "main",
            "description": null,
            "status": "created",
            "created_at": "2024-05-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn read_of_deleted_resource_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/network/v0/vpcs/vpc-gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new("mgc_network_vpcs", "main");
        let state = provider.read(&id, Some("vpc-gone")).await.unwrap();
        assert!(!state.exists);
        assert_eq!(state.identifier, None);
    }

    #[tokio::test]
    async fn read_without_identifier_is_not_found() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);
        let id = ResourceId::new("mgc_network_vpcs", "main");
        let state = provider.read(&id, None).await.unwrap();
        assert!(!state.exists);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_returns_identifier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/network/v0/vpcs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "vpc-1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/network/v0/vpcs/vpc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vpc_body()))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let resource =
            Resource::new("mgc_network_vpcs", "main").with_attribute("name", Value::from("main"));
        let state = provider.create(&resource).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("vpc-1"));
        assert_eq!(state.attributes["status"], Value::from("created"));
        assert_eq!(state.attributes["description"], Value::Null);
    }

    #[tokio::test]
    async fn create_rejects_invalid_configuration() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);
        let resource = Resource::new("mgc_network_vpcs", "main")
            .with_attribute("name", Value::from("main"))
            .with_attribute("status", Value::from("created"))
            .with_attribute("colour", Value::from("blue"));

        let err = provider.create(&resource).await.unwrap_err();
        assert_eq!(err.message, "Invalid configuration");
        let detail = err.detail.unwrap();
        assert!(detail.contains("status"));
        assert!(detail.contains("colour"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn immutable_change_is_rejected() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);
        let id = ResourceId::new("mgc_network_vpcs", "main");
        let from = State::existing(
            id.clone(),
            crate::tfutil::attributes([("name", Value::from("main"))]),
        );
        let to = Resource::new("mgc_network_vpcs", "main")
            .with_attribute("name", Value::from("renamed"));

        let err = provider.update(&id, "vpc-1", &from, &to).await.unwrap_err();
        assert_eq!(err.resource_id, Some(id));
        assert!(err.diagnostic().summary.contains("requires replacement"));
    }

    #[tokio::test]
    async fn unknown_type_is_an_error() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);
        let resource = Resource::new("mgc_nothing", "x");

        let err = provider.create(&resource).await.unwrap_err();
        assert_eq!(err.message, "Unknown resource type: mgc_nothing");

        let err = provider
            .read_data_source(&resource.with_read_only(true))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Unknown data source type: mgc_nothing");
    }

    #[tokio::test]
    async fn wrong_provider_data_is_a_diagnostic() {
        let provider = MgcProvider::from_data(Arc::new("not a context"));
        let id = ResourceId::new("mgc_network_vpcs", "main");

        let err = provider.read(&id, Some("vpc-1")).await.unwrap_err();
        assert_eq!(err.message, "Unexpected Resource Configure Type");

        let data = Resource::new("mgc_network_vpc", "main")
            .with_attribute("id", Value::from("vpc-1"))
            .with_read_only(true);
        let err = provider.read_data_source(&data).await.unwrap_err();
        assert_eq!(err.message, "Unexpected Data Source Configure Type");
    }

    #[tokio::test]
    async fn data_source_reads_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/network/v0/vpcs/vpc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vpc_body()))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let data = Resource::new("mgc_network_vpc", "main")
            .with_attribute("id", Value::from("vpc-1"))
            .with_read_only(true);
        let state = provider.read_data_source(&data).await.unwrap();
        assert_eq!(state.attributes["name"], Value::from("main"));
    }

    #[test]
    fn registers_every_type() {
        let provider = MgcProvider::from_data(Arc::new(()));
        assert_eq!(provider.name(), "mgc");
        assert_eq!(provider.resource_types().len(), 17);
        assert_eq!(provider.data_source_types().len(), 27);
    }

    fn no_env(_: &str) -> Option<ConfigValue> {
        None
    }

    #[tokio::test]
    async fn configure_warns_without_object_storage_keys() {
        let explicit = crate::tfutil::attributes([
            ("api_key", Value::from("k")),
            ("server_url", Value::from("http://localhost:1")),
        ]);
        let (provider, warnings) = MgcProvider::configure_with(&explicit, &no_env)
            .await
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].summary, "Object Storage Disabled");
        assert!(!warnings[0].is_error());
        assert_eq!(provider.resource_types().len(), 17);
    }

    #[tokio::test]
    async fn object_storage_rejection_only_disables_buckets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/network/v0/vpcs/vpc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vpc_body()))
            .mount(&server)
            .await;

        let explicit = crate::tfutil::attributes([
            ("api_key", Value::from("k")),
            ("env", Value::from("dev-qa")),
            ("server_url", Value::from(server.uri())),
            (
                "key_pair",
                Value::Map(crate::tfutil::attributes([
                    ("key_id", Value::from("id")),
                    ("key_secret", Value::from("secret")),
                ])),
            ),
        ]);
        let (provider, warnings) = MgcProvider::configure_with(&explicit, &no_env)
            .await
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].summary, "Object Storage Disabled");
        assert!(warnings[0].detail.contains("dev-qa"));

        let vpc = provider
            .read(&ResourceId::new("mgc_network_vpcs", "main"), Some("vpc-1"))
            .await
            .unwrap();
        assert!(vpc.exists);

        let bucket = provider
            .read(&ResourceId::new("mgc_object_storage_buckets", "logs"), Some("logs"))
            .await
            .unwrap_err();
        assert_eq!(bucket.message, "Object Storage Unavailable");
    }

    #[tokio::test]
    async fn configure_without_api_key_fails() {
        let err = MgcProvider::configure_with(&Attributes::new(), &no_env)
            .await
            .err()
            .unwrap();
        assert_eq!(err.summary, "Missing API Key");
    }
}
