//! Compute data sources

use async_trait::async_trait;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::ProviderResult;
use mgc_core::resource::{Attributes, Value};
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use mgc_sdk::compute::ComputeClient;

use crate::adapter::{Configure, DataSourceAdapter};
use crate::context::ConfigureRequest;
use crate::data_sources::read_only;
use crate::models::compute::{flatten_image, flatten_instance, flatten_machine_type, flatten_ssh_key};
use crate::resources::compute::{InstanceResource, SshKeyResource};
use crate::schemas;
use crate::tfutil::{attributes, optional_str, required_str, sdk_error};

fn compute_client(request: ConfigureRequest<'_>) -> Result<ComputeClient, Diagnostic> {
    Ok(ComputeClient::new(request.context()?.client.clone()))
}

// =============================================================================
// mgc_virtual_machine_instance
// =============================================================================

pub struct InstanceDataSource {
    compute: ComputeClient,
}

impl Configure for InstanceDataSource {
    const TYPE_NAME: &'static str = "mgc_virtual_machine_instance";

    fn schema() -> ResourceSchema {
        read_only(InstanceResource::schema(), Self::TYPE_NAME)
            .with_description("Look up a virtual machine instance by ID")
            .attribute(schemas::id_argument("instance"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            compute: compute_client(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for InstanceDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let id = required_str(config, "id")?;
        let instance = self.compute.get_instance(&id).await.map_err(sdk_error)?;
        Ok(flatten_instance(&instance))
    }
}

// =============================================================================
// mgc_virtual_machine_instances
// =============================================================================

pub struct InstancesDataSource {
    compute: ComputeClient,
}

impl Configure for InstancesDataSource {
    const TYPE_NAME: &'static str = "mgc_virtual_machine_instances";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("All virtual machine instances of the tenant")
            .attribute(
                AttributeSchema::new("name_is_like", AttributeType::String)
                    .with_description("Only instances whose name contains this text"),
            )
            .attribute(schemas::computed_list(
                "instances",
                schemas::object_of(InstanceResource::schema()),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            compute: compute_client(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for InstancesDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let filter = optional_str(config, "name_is_like");
        let instances = self
            .compute
            .list_all_instances()
            .await
            .map_err(sdk_error)?
            .iter()
            .filter(|i| match (&filter, &i.name) {
                (Some(filter), Some(name)) => name.contains(filter.as_str()),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .map(|i| Value::Map(flatten_instance(i)))
            .collect::<Vec<_>>();

        Ok(attributes([
            ("name_is_like", filter.into()),
            ("instances", Value::List(instances)),
        ]))
    }
}

// =============================================================================
// mgc_virtual_machine_types
// =============================================================================

pub struct MachineTypesDataSource {
    compute: ComputeClient,
}

impl Configure for MachineTypesDataSource {
    const TYPE_NAME: &'static str = "mgc_virtual_machine_types";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Machine types available for instances")
            .attribute(schemas::computed_list(
                "machine_types",
                schemas::computed_object([
                    schemas::computed_string("id"),
                    schemas::computed_string("name"),
                    schemas::computed_int("vcpus"),
                    schemas::computed_int("ram"),
                    schemas::computed_int("disk"),
                    schemas::computed_int("gpu"),
                    schemas::computed_string("status"),
                    schemas::computed_list("availability_zones", AttributeType::String),
                ]),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            compute: compute_client(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for MachineTypesDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let types = self.compute.list_machine_types().await.map_err(sdk_error)?;
        Ok(attributes([(
            "machine_types",
            Value::List(types.iter().map(flatten_machine_type).collect()),
        )]))
    }
}

// =============================================================================
// mgc_virtual_machine_images
// =============================================================================

pub struct ImagesDataSource {
    compute: ComputeClient,
}

impl Configure for ImagesDataSource {
    const TYPE_NAME: &'static str = "mgc_virtual_machine_images";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Images available for instances")
            .attribute(schemas::computed_list(
                "images",
                schemas::computed_object([
                    schemas::computed_string("id"),
                    schemas::computed_string("name"),
                    schemas::computed_string("status"),
                    schemas::computed_string("version"),
                    schemas::computed_string("platform"),
                    schemas::computed_string("release_at"),
                    schemas::computed_string("end_standard_support_at"),
                    schemas::computed_int("minimum_vcpu"),
                    schemas::computed_int("minimum_ram"),
                    schemas::computed_int("minimum_disk"),
                    schemas::computed_list("availability_zones", AttributeType::String),
                ]),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            compute: compute_client(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for ImagesDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let images = self.compute.list_images().await.map_err(sdk_error)?;
        Ok(attributes([(
            "images",
            Value::List(images.iter().map(flatten_image).collect()),
        )]))
    }
}

// =============================================================================
// mgc_ssh_keys
// =============================================================================

pub struct SshKeysDataSource {
    compute: ComputeClient,
}

impl Configure for SshKeysDataSource {
    const TYPE_NAME: &'static str = "mgc_ssh_keys";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("SSH keys of the current user")
            .attribute(schemas::computed_list(
                "ssh_keys",
                schemas::object_of(SshKeyResource::schema()),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            compute: compute_client(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for SshKeysDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let keys = self.compute.list_all_ssh_keys().await.map_err(sdk_error)?;
        Ok(attributes([(
            "ssh_keys",
            Value::List(keys.iter().map(|k| Value::Map(flatten_ssh_key(k))).collect()),
        )]))
    }
}
