//! DBaaS data sources

use async_trait::async_trait;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::ProviderResult;
use mgc_core::resource::{Attributes, Value};
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use mgc_sdk::dbaas::DbaasClient;

use crate::adapter::{Configure, DataSourceAdapter};
use crate::context::ConfigureRequest;
use crate::data_sources::read_only;
use crate::models::dbaas::{flatten_cluster, flatten_engine, flatten_instance, flatten_instance_type};
use crate::resources::dbaas::{DatabaseClusterResource, DatabaseInstanceResource};
use crate::schemas;
use crate::tfutil::{attributes, optional_str, required_str, sdk_error};

fn dbaas(request: ConfigureRequest<'_>) -> Result<DbaasClient, Diagnostic> {
    Ok(DbaasClient::new(request.context()?.client.clone()))
}

/// Resource schema minus the write-only credentials
fn database_view(schema: ResourceSchema, type_name: &str) -> ResourceSchema {
    let mut schema = read_only(schema, type_name);
    schema.attributes.remove("user");
    schema.attributes.remove("password");
    schema
}

pub struct DatabaseInstanceDataSource {
    dbaas: DbaasClient,
}

impl Configure for DatabaseInstanceDataSource {
    const TYPE_NAME: &'static str = "mgc_dbaas_instance";

    fn schema() -> ResourceSchema {
        database_view(DatabaseInstanceResource::schema(), Self::TYPE_NAME)
            .with_description("Look up a database instance by ID")
            .attribute(schemas::id_argument("database instance"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            dbaas: dbaas(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for DatabaseInstanceDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let id = required_str(config, "id")?;
        let instance = self.dbaas.get_instance(&id).await.map_err(sdk_error)?;
        Ok(flatten_instance(&instance))
    }
}

pub struct DatabaseInstancesDataSource {
    dbaas: DbaasClient,
}

impl Configure for DatabaseInstancesDataSource {
    const TYPE_NAME: &'static str = "mgc_dbaas_instances";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("All database instances of the tenant")
            .attribute(
                AttributeSchema::new("status_filter", AttributeType::String)
                    .with_description("Only instances in this status, e.g. ACTIVE"),
            )
            .attribute(schemas::computed_list(
                "instances",
                schemas::object_of(database_view(
                    DatabaseInstanceResource::schema(),
                    Self::TYPE_NAME,
                )),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            dbaas: dbaas(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for DatabaseInstancesDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let status = optional_str(config, "status_filter");
        let instances = self
            .dbaas
            .list_all_instances()
            .await
            .map_err(sdk_error)?
            .iter()
            .filter(|i| {
                status
                    .as_deref()
                    .is_none_or(|s| i.status.eq_ignore_ascii_case(s))
            })
            .map(|i| Value::Map(flatten_instance(i)))
            .collect();
        Ok(attributes([
            ("status_filter", status.into()),
            ("instances", Value::List(instances)),
        ]))
    }
}

pub struct DatabaseClustersDataSource {
    dbaas: DbaasClient,
}

impl Configure for DatabaseClustersDataSource {
    const TYPE_NAME: &'static str = "mgc_dbaas_clusters";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("All database clusters of the tenant")
            .attribute(schemas::computed_list(
                "clusters",
                schemas::object_of(database_view(
                    DatabaseClusterResource::schema(),
                    Self::TYPE_NAME,
                )),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            dbaas: dbaas(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for DatabaseClustersDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let clusters = self.dbaas.list_all_clusters().await.map_err(sdk_error)?;
        Ok(attributes([(
            "clusters",
            Value::List(clusters.iter().map(|c| Value::Map(flatten_cluster(c))).collect()),
        )]))
    }
}

pub struct EnginesDataSource {
    dbaas: DbaasClient,
}

impl Configure for EnginesDataSource {
    const TYPE_NAME: &'static str = "mgc_dbaas_engines";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Database engines and versions")
            .attribute(schemas::computed_list(
                "engines",
                schemas::computed_object([
                    schemas::computed_string("id"),
                    schemas::computed_string("name"),
                    schemas::computed_string("version"),
                    schemas::computed_string("status"),
                ]),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            dbaas: dbaas(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for EnginesDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let engines = self.dbaas.list_engines().await.map_err(sdk_error)?;
        Ok(attributes([(
            "engines",
            Value::List(engines.iter().map(flatten_engine).collect()),
        )]))
    }
}

pub struct InstanceTypesDataSource {
    dbaas: DbaasClient,
}

impl Configure for InstanceTypesDataSource {
    const TYPE_NAME: &'static str = "mgc_dbaas_instance_types";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Database instance sizes")
            .attribute(schemas::computed_list(
                "instance_types",
                schemas::computed_object([
                    schemas::computed_string("id"),
                    schemas::computed_string("name"),
                    schemas::computed_string("label"),
                    schemas::computed_string("family_slug"),
                    schemas::computed_string("family_description"),
                    schemas::computed_string("vcpu"),
                    schemas::computed_string("ram"),
                    schemas::computed_string("size"),
                    schemas::computed_string("compatible_product"),
                    schemas::computed_string("status"),
                ]),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            dbaas: dbaas(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for InstanceTypesDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let types = self.dbaas.list_instance_types().await.map_err(sdk_error)?;
        Ok(attributes([(
            "instance_types",
            Value::List(types.iter().map(flatten_instance_type).collect()),
        )]))
    }
}
