//! Object storage data sources

use async_trait::async_trait;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::ProviderResult;
use mgc_core::resource::{Attributes, Value};
use mgc_core::schema::ResourceSchema;
use mgc_sdk::ObjectStorageClient;

use crate::adapter::{Configure, DataSourceAdapter};
use crate::context::ConfigureRequest;
use crate::models::object_storage::flatten_bucket_listing;
use crate::schemas;
use crate::tfutil::{attributes, sdk_error};

pub struct BucketsDataSource {
    object_storage: ObjectStorageClient,
}

impl Configure for BucketsDataSource {
    const TYPE_NAME: &'static str = "mgc_object_storage_buckets";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Buckets visible to the configured key pair")
            .attribute(schemas::computed_list(
                "buckets",
                schemas::computed_object([
                    schemas::computed_string("name"),
                    schemas::computed_string("creation_date"),
                ]),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let context = request.context()?;
        Ok(Self {
            object_storage: context.object_storage()?.clone(),
        })
    }
}

#[async_trait]
impl DataSourceAdapter for BucketsDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let buckets = self
            .object_storage
            .list_buckets()
            .await
            .map_err(sdk_error)?;
        Ok(attributes([(
            "buckets",
            Value::List(buckets.iter().map(flatten_bucket_listing).collect()),
        )]))
    }
}
