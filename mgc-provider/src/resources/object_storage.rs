//! Object storage buckets, managed over the S3 API

use async_trait::async_trait;
use log::info;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::ProviderResult;
use mgc_core::resource::Attributes;
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use mgc_sdk::ObjectStorageClient;

use crate::adapter::{Configure, ResourceAdapter};
use crate::context::ConfigureRequest;
use crate::models::object_storage::flatten_bucket;
use crate::tfutil::{changed, ensure_unchanged, optional_bool, required_str, sdk_error};

/// A bucket is identified by its name
pub struct BucketResource {
    object_storage: ObjectStorageClient,
}

impl BucketResource {
    async fn read_bucket(&self, bucket: &str) -> ProviderResult<Attributes> {
        let versioning = self
            .object_storage
            .versioning_enabled(bucket)
            .await
            .map_err(sdk_error)?;
        Ok(flatten_bucket(bucket, versioning))
    }
}

impl Configure for BucketResource {
    const TYPE_NAME: &'static str = "mgc_object_storage_buckets";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Object storage bucket; needs an object storage key pair")
            .attribute(crate::schemas::computed_string("id"))
            .attribute(
                AttributeSchema::new("bucket", AttributeType::String)
                    .required()
                    .with_description("Bucket name, 3 to 63 characters"),
            )
            .attribute(
                AttributeSchema::new("enable_versioning", AttributeType::Bool)
                    .optional_computed()
                    .with_description("Keep every version of stored objects"),
            )
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let context = request.context()?;
        Ok(Self {
            object_storage: context.object_storage()?.clone(),
        })
    }
}

#[async_trait]
impl ResourceAdapter for BucketResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        if !self
            .object_storage
            .bucket_exists(identifier)
            .await
            .map_err(sdk_error)?
        {
            return Ok(None);
        }
        Ok(Some(self.read_bucket(identifier).await?))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let bucket = required_str(config, "bucket")?;
        self.object_storage
            .create_bucket(&bucket)
            .await
            .map_err(sdk_error)?;
        info!("created bucket {}", bucket);

        if optional_bool(config, "enable_versioning") == Some(true) {
            self.object_storage
                .set_versioning(&bucket, true)
                .await
                .map_err(sdk_error)?;
        }
        let attrs = self.read_bucket(&bucket).await?;
        Ok((bucket, attrs))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, &["bucket"])?;
        if changed(from, to, "enable_versioning") {
            let enabled = optional_bool(to, "enable_versioning").unwrap_or(false);
            self.object_storage
                .set_versioning(identifier, enabled)
                .await
                .map_err(sdk_error)?;
        }
        self.read_bucket(identifier).await
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.object_storage
            .delete_bucket(identifier)
            .await
            .map_err(sdk_error)
    }
}
