//! Container registries

use async_trait::async_trait;
use log::info;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::ProviderResult;
use mgc_core::resource::Attributes;
use mgc_core::schema::ResourceSchema;
use mgc_sdk::ContainerRegistryClient;

use crate::adapter::{Configure, ResourceAdapter};
use crate::context::ConfigureRequest;
use crate::models::container_registry::flatten_registry;
use crate::schemas;
use crate::tfutil::{ensure_unchanged, found, required_str, sdk_error};

pub struct ContainerRegistryResource {
    registries: ContainerRegistryClient,
}

impl Configure for ContainerRegistryResource {
    const TYPE_NAME: &'static str = "mgc_container_registries";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Container registry")
            .attribute(schemas::id())
            .attribute(
                schemas::name()
                    .with_description("Lowercase letters, digits, '.', '_' and '-'"),
            )
            .attribute(schemas::computed_int("storage_usage_bytes"))
            .attributes(schemas::timestamps())
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let context = request.context()?;
        Ok(Self {
            registries: ContainerRegistryClient::new(context.client.clone()),
        })
    }
}

#[async_trait]
impl ResourceAdapter for ContainerRegistryResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let registry = found(self.registries.get_registry(identifier).await)?;
        Ok(registry.as_ref().map(flatten_registry))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let id = self
            .registries
            .create_registry(&required_str(config, "name")?)
            .await
            .map_err(sdk_error)?;
        info!("created container registry {}", id);
        let registry = self.registries.get_registry(&id).await.map_err(sdk_error)?;
        Ok((id, flatten_registry(&registry)))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, &["name"])?;
        let registry = self
            .registries
            .get_registry(identifier)
            .await
            .map_err(sdk_error)?;
        Ok(flatten_registry(&registry))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.registries
            .delete_registry(identifier)
            .await
            .map_err(sdk_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProviderData;
    use crate::context::tests::context_for;
    use crate::tfutil::attributes;
    use mgc_core::resource::Value;

    #[tokio::test]
    async fn invalid_name_is_rejected_locally() {
        let data: ProviderData = context_for("http://127.0.0.1:1");
        let resource =
            ContainerRegistryResource::configure(ConfigureRequest::resource(&data)).unwrap();
        let err = resource
            .create(&attributes([("name", Value::from("Bad_Name"))]))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Request validation failed");
        assert!(err.detail.unwrap().starts_with("Field: name"));
    }
}
