//! Block storage data sources

use async_trait::async_trait;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::ProviderResult;
use mgc_core::resource::{Attributes, Value};
use mgc_core::schema::{AttributeType, ResourceSchema};
use mgc_sdk::block_storage::BlockStorageClient;

use crate::adapter::{Configure, DataSourceAdapter};
use crate::context::ConfigureRequest;
use crate::data_sources::read_only;
use crate::models::block_storage::{flatten_volume, flatten_volume_type};
use crate::resources::block_storage::VolumeResource;
use crate::schemas;
use crate::tfutil::{attributes, required_str, sdk_error};

fn block_storage(request: ConfigureRequest<'_>) -> Result<BlockStorageClient, Diagnostic> {
    Ok(BlockStorageClient::new(request.context()?.client.clone()))
}

pub struct VolumeDataSource {
    block_storage: BlockStorageClient,
}

impl Configure for VolumeDataSource {
    const TYPE_NAME: &'static str = "mgc_block_storage_volume";

    fn schema() -> ResourceSchema {
        read_only(VolumeResource::schema(), Self::TYPE_NAME)
            .with_description("Look up a block storage volume by ID")
            .attribute(schemas::id_argument("volume"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            block_storage: block_storage(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for VolumeDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let id = required_str(config, "id")?;
        let volume = self.block_storage.get_volume(&id).await.map_err(sdk_error)?;
        Ok(flatten_volume(&volume))
    }
}

pub struct VolumesDataSource {
    block_storage: BlockStorageClient,
}

impl Configure for VolumesDataSource {
    const TYPE_NAME: &'static str = "mgc_block_storage_volumes";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("All block storage volumes of the tenant")
            .attribute(schemas::computed_list(
                "volumes",
                schemas::object_of(read_only(VolumeResource::schema(), Self::TYPE_NAME)),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            block_storage: block_storage(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for VolumesDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let volumes = self
            .block_storage
            .list_all_volumes()
            .await
            .map_err(sdk_error)?;
        Ok(attributes([(
            "volumes",
            Value::List(volumes.iter().map(|v| Value::Map(flatten_volume(v))).collect()),
        )]))
    }
}

pub struct VolumeTypesDataSource {
    block_storage: BlockStorageClient,
}

impl Configure for VolumeTypesDataSource {
    const TYPE_NAME: &'static str = "mgc_block_storage_volume_types";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Volume types offered in the region")
            .attribute(schemas::computed_list(
                "volume_types",
                schemas::computed_object([
                    schemas::computed_string("id"),
                    schemas::computed_string("name"),
                    schemas::computed_string("disk_type"),
                    schemas::computed_string("status"),
                    schemas::computed_int("read_iops"),
                    schemas::computed_int("write_iops"),
                    schemas::computed_int("total_iops"),
                    schemas::computed_list("availability_zones", AttributeType::String),
                    schemas::computed_bool("allows_encryption"),
                ]),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            block_storage: block_storage(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for VolumeTypesDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let types = self
            .block_storage
            .list_volume_types()
            .await
            .map_err(sdk_error)?;
        Ok(attributes([(
            "volume_types",
            Value::List(types.iter().map(flatten_volume_type).collect()),
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProviderData;
    use crate::context::tests::context_for;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn volume_types_with_iops() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volume/v1/volume-types"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "types": [{
                    "id": "t-1",
                    "name": "cloud_nvme1k",
                    "disk_type": "nvme",
                    "status": "active",
                    "iops": {"read": 1000, "write": 1000},
                    "availability_zones": ["br-se1-a"]
                }]
            })))
            .mount(&server)
            .await;

        let data: ProviderData = context_for(&server.uri());
        let source = VolumeTypesDataSource::configure(ConfigureRequest::data_source(&data)).unwrap();
        let attrs = source.read(&Attributes::new()).await.unwrap();
        let Value::List(types) = &attrs["volume_types"] else {
            panic!("expected list");
        };
        let first = types[0].as_map().unwrap();
        assert_eq!(first["read_iops"], Value::from(1000i64));
        assert_eq!(first["total_iops"], Value::Null);
    }

    #[tokio::test]
    async fn missing_volume_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volume/v1/volumes/nope"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let data: ProviderData = context_for(&server.uri());
        let source = VolumeDataSource::configure(ConfigureRequest::data_source(&data)).unwrap();
        let config = attributes([("id", Value::from("nope"))]);
        let err = source.read(&config).await.unwrap_err();
        assert_eq!(err.message, "API request failed with HTTP error");
    }
}
