//! Container registry data sources

use async_trait::async_trait;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::ProviderResult;
use mgc_core::resource::{Attributes, Value};
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use mgc_sdk::ContainerRegistryClient;

use crate::adapter::{Configure, DataSourceAdapter};
use crate::context::ConfigureRequest;
use crate::data_sources::read_only;
use crate::models::container_registry::{flatten_credentials, flatten_registry, flatten_repository};
use crate::resources::container_registry::ContainerRegistryResource;
use crate::schemas;
use crate::tfutil::{attributes, required_str, sdk_error};

fn registries(request: ConfigureRequest<'_>) -> Result<ContainerRegistryClient, Diagnostic> {
    Ok(ContainerRegistryClient::new(request.context()?.client.clone()))
}

pub struct RegistriesDataSource {
    registries: ContainerRegistryClient,
}

impl Configure for RegistriesDataSource {
    const TYPE_NAME: &'static str = "mgc_container_registries";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("All container registries of the tenant")
            .attribute(schemas::computed_list(
                "registries",
                schemas::object_of(read_only(
                    ContainerRegistryResource::schema(),
                    Self::TYPE_NAME,
                )),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            registries: registries(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for RegistriesDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let registries = self
            .registries
            .list_all_registries()
            .await
            .map_err(sdk_error)?;
        Ok(attributes([(
            "registries",
            Value::List(
                registries
                    .iter()
                    .map(|r| Value::Map(flatten_registry(r)))
                    .collect(),
            ),
        )]))
    }
}

pub struct CredentialsDataSource {
    registries: ContainerRegistryClient,
}

impl Configure for CredentialsDataSource {
    const TYPE_NAME: &'static str = "mgc_container_credentials";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Docker login credentials for the tenant's registries")
            .attribute(schemas::computed_string("username"))
            .attribute(
                AttributeSchema::new("password", AttributeType::String)
                    .computed()
                    .sensitive(),
            )
            .attribute(schemas::computed_string("email"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            registries: registries(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for CredentialsDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let credentials = self
            .registries
            .get_credentials()
            .await
            .map_err(sdk_error)?;
        Ok(flatten_credentials(&credentials))
    }
}

pub struct RepositoriesDataSource {
    registries: ContainerRegistryClient,
}

impl Configure for RepositoriesDataSource {
    const TYPE_NAME: &'static str = "mgc_container_repositories";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Repositories of a container registry")
            .attribute(AttributeSchema::new("registry_id", AttributeType::String).required())
            .attribute(schemas::computed_list(
                "repositories",
                schemas::computed_object([
                    schemas::computed_string("registry_name"),
                    schemas::computed_string("name"),
                    schemas::computed_int("image_count"),
                    schemas::computed_string("created_at"),
                    schemas::computed_string("updated_at"),
                ]),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            registries: registries(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for RepositoriesDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let registry_id = required_str(config, "registry_id")?;
        let repositories = self
            .registries
            .list_all_repositories(&registry_id)
            .await
            .map_err(sdk_error)?;
        Ok(attributes([
            ("registry_id", registry_id.into()),
            (
                "repositories",
                Value::List(repositories.iter().map(flatten_repository).collect()),
            ),
        ]))
    }
}
