//! Block storage volumes, volume attachments and volume snapshots

use async_trait::async_trait;
use log::{debug, info};
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::{ProviderError, ProviderResult};
use mgc_core::resource::Attributes;
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use mgc_sdk::block_storage::{BlockStorageClient, Volume, VolumeCreateRequest, VolumeSnapshot};
use mgc_sdk::common::IdOrName;

use crate::adapter::{Configure, ResourceAdapter};
use crate::context::ConfigureRequest;
use crate::models::block_storage::{flatten_attachment, flatten_volume, flatten_volume_snapshot};
use crate::schemas;
use crate::tfutil::{
    Poll, WaitConfig, carry_over, changed, ensure_unchanged, found, optional_bool, optional_str,
    required_int, required_str, sdk_error, wait_for,
};

fn settled(status: &str, state: &str, wanted: &str) -> Poll {
    if status.contains("error") || state == "error" {
        Poll::Failed(format!("status {}, state {}", status, state))
    } else if status == "completed" && state == wanted {
        Poll::Ready
    } else {
        Poll::Pending
    }
}

fn block_storage(request: ConfigureRequest<'_>) -> Result<(BlockStorageClient, WaitConfig), Diagnostic> {
    let context = request.context()?;
    Ok((BlockStorageClient::new(context.client.clone()), context.wait))
}

async fn wait_volume(
    client: &BlockStorageClient,
    wait: &WaitConfig,
    id: &str,
    check: impl Fn(&Volume) -> Poll,
) -> ProviderResult<Volume> {
    wait_for(wait, &format!("volume {}", id), || client.get_volume(id), check).await
}

// =============================================================================
// mgc_block_storage_volumes
// =============================================================================

pub struct VolumeResource {
    block_storage: BlockStorageClient,
    wait: WaitConfig,
}

/// A volume is settled once it is available or attached
fn volume_settled(volume: &Volume) -> Poll {
    let wanted = if volume.attachment.is_some() { "in-use" } else { "available" };
    settled(&volume.status, &volume.state, wanted)
}

impl Configure for VolumeResource {
    const TYPE_NAME: &'static str = "mgc_block_storage_volumes";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Block storage volume")
            .attribute(schemas::id())
            .attribute(schemas::name())
            .attribute(
                AttributeSchema::new("size", types::positive_int())
                    .required()
                    .with_description("Size in GiB; volumes can only grow"),
            )
            .attribute(
                AttributeSchema::new("type", AttributeType::String)
                    .required()
                    .with_description("Volume type name, e.g. cloud_nvme1k"),
            )
            .attribute(
                AttributeSchema::new("availability_zone", schemas::availability_zone())
                    .optional_computed(),
            )
            .attribute(AttributeSchema::new("encrypted", AttributeType::Bool).optional_computed())
            .attribute(
                AttributeSchema::new("snapshot_id", AttributeType::String)
                    .with_description("Create the volume from this snapshot"),
            )
            .attributes([
                schemas::computed_string("type_id"),
                schemas::computed_string("disk_type"),
                schemas::computed_string("status"),
                schemas::computed_string("state"),
                schemas::computed_string("instance_id"),
                schemas::computed_string("device"),
            ])
            .attributes(schemas::timestamps())
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (block_storage, wait) = block_storage(request)?;
        Ok(Self { block_storage, wait })
    }
}

#[async_trait]
impl ResourceAdapter for VolumeResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let volume = found(self.block_storage.get_volume(identifier).await)?;
        Ok(volume.as_ref().map(flatten_volume))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let request = VolumeCreateRequest {
            name: required_str(config, "name")?,
            size: required_int(config, "size")?,
            volume_type: IdOrName::name(required_str(config, "type")?),
            availability_zone: optional_str(config, "availability_zone"),
            encrypted: optional_bool(config, "encrypted"),
            snapshot: optional_str(config, "snapshot_id").map(IdOrName::id),
        };
        let id = self
            .block_storage
            .create_volume(&request)
            .await
            .map_err(sdk_error)?;
        info!("created volume {}", id);

        let volume = wait_volume(&self.block_storage, &self.wait, &id, volume_settled).await?;
        Ok((id, carry_over(flatten_volume(&volume), config, &["snapshot_id"])))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, &["availability_zone", "encrypted", "snapshot_id"])?;

        if changed(from, to, "name") {
            self.block_storage
                .rename_volume(identifier, &required_str(to, "name")?)
                .await
                .map_err(sdk_error)?;
        }
        if changed(from, to, "size") {
            let size = required_int(to, "size")?;
            let current = required_int(from, "size")?;
            if size < current {
                return Err(ProviderError::new("Volume cannot shrink").with_detail(format!(
                    "size can only grow, from {} to {} GiB requested",
                    current, size
                )));
            }
            self.block_storage
                .extend_volume(identifier, size)
                .await
                .map_err(sdk_error)?;
            wait_volume(&self.block_storage, &self.wait, identifier, volume_settled).await?;
        }
        if changed(from, to, "type") {
            let volume_type = IdOrName::name(required_str(to, "type")?);
            self.block_storage
                .retype_volume(identifier, &volume_type)
                .await
                .map_err(sdk_error)?;
        }

        let volume = wait_volume(&self.block_storage, &self.wait, identifier, volume_settled).await?;
        Ok(carry_over(flatten_volume(&volume), to, &["snapshot_id"]))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.block_storage
            .delete_volume(identifier)
            .await
            .map_err(sdk_error)
    }
}

// =============================================================================
// mgc_block_storage_volume_attachment
// =============================================================================

/// Attachment of a volume to an instance; identified by the volume ID
pub struct VolumeAttachmentResource {
    block_storage: BlockStorageClient,
    wait: WaitConfig,
}

impl Configure for VolumeAttachmentResource {
    const TYPE_NAME: &'static str = "mgc_block_storage_volume_attachment";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Attachment of a block storage volume to an instance")
            .attribute(AttributeSchema::new("block_storage_id", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("virtual_machine_id", AttributeType::String).required(),
            )
            .attribute(schemas::computed_string("device"))
            .attribute(schemas::computed_string("attached_at"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (block_storage, wait) = block_storage(request)?;
        Ok(Self { block_storage, wait })
    }
}

#[async_trait]
impl ResourceAdapter for VolumeAttachmentResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let volume = found(self.block_storage.get_volume(identifier).await)?;
        Ok(volume.as_ref().and_then(flatten_attachment))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let volume_id = required_str(config, "block_storage_id")?;
        let instance_id = required_str(config, "virtual_machine_id")?;
        self.block_storage
            .attach_volume(&volume_id, &instance_id)
            .await
            .map_err(sdk_error)?;
        debug!("attaching volume {} to {}", volume_id, instance_id);

        let volume = wait_volume(&self.block_storage, &self.wait, &volume_id, |v| {
            if v.attachment.is_none() {
                return Poll::Pending;
            }
            settled(&v.status, &v.state, "in-use")
        })
        .await?;
        let attrs = flatten_attachment(&volume).ok_or_else(|| {
            ProviderError::new("Volume attachment missing")
                .with_detail(format!("volume {} reports no attachment", volume_id))
        })?;
        Ok((volume_id, attrs))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, &["block_storage_id", "virtual_machine_id"])?;
        self.read(identifier).await?.ok_or_else(|| {
            ProviderError::new("Volume attachment missing")
                .with_detail(format!("volume {} is no longer attached", identifier))
        })
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.block_storage
            .detach_volume(identifier)
            .await
            .map_err(sdk_error)?;
        wait_volume(&self.block_storage, &self.wait, identifier, |v| {
            if v.attachment.is_some() {
                return Poll::Pending;
            }
            settled(&v.status, &v.state, "available")
        })
        .await?;
        Ok(())
    }
}

// =============================================================================
// mgc_block_storage_snapshots
// =============================================================================

pub struct VolumeSnapshotResource {
    block_storage: BlockStorageClient,
    wait: WaitConfig,
}

fn snapshot_settled(snapshot: &VolumeSnapshot) -> Poll {
    settled(&snapshot.status, &snapshot.state, "available")
}

impl Configure for VolumeSnapshotResource {
    const TYPE_NAME: &'static str = "mgc_block_storage_snapshots";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Snapshot of a block storage volume")
            .attribute(schemas::id())
            .attribute(schemas::name())
            .attribute(schemas::description())
            .attribute(AttributeSchema::new("volume_id", AttributeType::String).required())
            .attributes([
                schemas::computed_int("size"),
                schemas::computed_string("type"),
                schemas::computed_string("status"),
                schemas::computed_string("state"),
            ])
            .attributes(schemas::timestamps())
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (block_storage, wait) = block_storage(request)?;
        Ok(Self { block_storage, wait })
    }
}

#[async_trait]
impl ResourceAdapter for VolumeSnapshotResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let snapshot = found(self.block_storage.get_snapshot(identifier).await)?;
        Ok(snapshot.as_ref().map(flatten_volume_snapshot))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let description = optional_str(config, "description");
        let id = self
            .block_storage
            .create_snapshot(
                &required_str(config, "volume_id")?,
                &required_str(config, "name")?,
                description.as_deref(),
            )
            .await
            .map_err(sdk_error)?;
        info!("created volume snapshot {}", id);

        let snapshot = wait_for(
            &self.wait,
            &format!("snapshot {}", id),
            || self.block_storage.get_snapshot(&id),
            snapshot_settled,
        )
        .await?;
        Ok((id, flatten_volume_snapshot(&snapshot)))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, &["volume_id", "description"])?;
        if changed(from, to, "name") {
            self.block_storage
                .rename_snapshot(identifier, &required_str(to, "name")?)
                .await
                .map_err(sdk_error)?;
        }
        let snapshot = self
            .block_storage
            .get_snapshot(identifier)
            .await
            .map_err(sdk_error)?;
        Ok(flatten_volume_snapshot(&snapshot))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.block_storage
            .delete_snapshot(identifier)
            .await
            .map_err(sdk_error)
    }
}
