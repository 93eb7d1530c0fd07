//! Block storage API client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::common::{IdOrName, IdResponse, page_query};
use crate::error::{Result, SdkError};
use crate::pagination::{DEFAULT_PAGE_LIMIT, paginate};

const VOLUMES: &str = "volume/v1/volumes";
const VOLUME_TYPES: &str = "volume/v1/volume-types";
const SNAPSHOTS: &str = "volume/v1/snapshots";

/// Volume size bounds in GiB
pub const MIN_VOLUME_SIZE: i64 = 10;
pub const MAX_VOLUME_SIZE: i64 = 50_000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Volume {
    pub id: String,
    pub name: String,
    pub size: i64,
    pub status: String,
    pub state: String,
    #[serde(rename = "type")]
    pub volume_type: VolumeTypeRef,
    pub attachment: Option<Attachment>,
    pub availability_zone: Option<String>,
    pub encrypted: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VolumeTypeRef {
    pub id: Option<String>,
    pub name: Option<String>,
    pub disk_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Attachment {
    pub instance: IdOrName,
    pub device: Option<String>,
    pub attached_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VolumeCreateRequest {
    pub name: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub volume_type: IdOrName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<IdOrName>,
}

impl VolumeCreateRequest {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SdkError::validation("name", "must not be empty"));
        }
        validate_size(self.size)
    }
}

fn validate_size(size: i64) -> Result<()> {
    if !(MIN_VOLUME_SIZE..=MAX_VOLUME_SIZE).contains(&size) {
        return Err(SdkError::validation(
            "size",
            format!(
                "must be between {} and {} GiB, got {}",
                MIN_VOLUME_SIZE, MAX_VOLUME_SIZE, size
            ),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VolumeType {
    pub id: String,
    pub name: String,
    pub disk_type: String,
    pub status: String,
    pub iops: Option<VolumeTypeIops>,
    #[serde(default)]
    pub availability_zones: Vec<String>,
    pub allows_encryption: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VolumeTypeIops {
    pub read: i64,
    pub write: i64,
    pub total: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VolumeSnapshot {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub size: i64,
    pub status: String,
    pub state: String,
    pub volume: Option<IdOrName>,
    #[serde(rename = "type")]
    pub snapshot_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct VolumeList {
    #[serde(default)]
    volumes: Vec<Volume>,
}

#[derive(Deserialize)]
struct VolumeTypeList {
    #[serde(default)]
    types: Vec<VolumeType>,
}

/// Block storage API client
#[derive(Debug, Clone)]
pub struct BlockStorageClient {
    client: Client,
}

impl BlockStorageClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn create_volume(&self, request: &VolumeCreateRequest) -> Result<String> {
        request.validate()?;
        let created: IdResponse = self.client.post(VOLUMES, request).await?;
        Ok(created.id)
    }

    pub async fn get_volume(&self, id: &str) -> Result<Volume> {
        self.client
            .get(
                &format!("{}/{}", VOLUMES, id),
                &[("expand", "volume_type,attachment".to_string())],
            )
            .await
    }

    pub async fn list_volumes(&self, offset: u32, limit: u32) -> Result<Vec<Volume>> {
        let mut query = page_query(offset, limit);
        query.push(("expand", "volume_type,attachment".to_string()));
        let list: VolumeList = self.client.get(VOLUMES, &query).await?;
        Ok(list.volumes)
    }

    pub async fn list_all_volumes(&self) -> Result<Vec<Volume>> {
        paginate(DEFAULT_PAGE_LIMIT, |offset, limit| {
            self.list_volumes(offset, limit)
        })
        .await
    }

    pub async fn rename_volume(&self, id: &str, name: &str) -> Result<()> {
        self.client
            .patch(
                &format!("{}/{}/rename", VOLUMES, id),
                &serde_json::json!({ "name": name }),
            )
            .await
    }

    /// Grow a volume; shrinking is rejected by the API
    pub async fn extend_volume(&self, id: &str, size: i64) -> Result<()> {
        validate_size(size)?;
        self.client
            .post_action(
                &format!("{}/{}/extend", VOLUMES, id),
                &serde_json::json!({ "size": size }),
            )
            .await
    }

    pub async fn retype_volume(&self, id: &str, volume_type: &IdOrName) -> Result<()> {
        self.client
            .post_action(
                &format!("{}/{}/retype", VOLUMES, id),
                &serde_json::json!({ "new_type": volume_type }),
            )
            .await
    }

    pub async fn attach_volume(&self, id: &str, instance_id: &str) -> Result<()> {
        self.client
            .post_action(
                &format!("{}/{}/attach/{}", VOLUMES, id, instance_id),
                &serde_json::json!({}),
            )
            .await
    }

    pub async fn detach_volume(&self, id: &str) -> Result<()> {
        self.client
            .post_action(&format!("{}/{}/detach", VOLUMES, id), &serde_json::json!({}))
            .await
    }

    pub async fn delete_volume(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("{}/{}", VOLUMES, id), &[]).await
    }

    pub async fn list_volume_types(&self) -> Result<Vec<VolumeType>> {
        let list: VolumeTypeList = self.client.get(VOLUME_TYPES, &[]).await?;
        Ok(list.types)
    }

    pub async fn create_snapshot(
        &self,
        volume_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<String> {
        let mut body = serde_json::json!({
            "name": name,
            "volume": { "id": volume_id },
        });
        if let Some(description) = description {
            body["description"] = serde_json::Value::from(description);
        }
        let created: IdResponse = self.client.post(SNAPSHOTS, &body).await?;
        Ok(created.id)
    }

    pub async fn get_snapshot(&self, id: &str) -> Result<VolumeSnapshot> {
        self.client
            .get(
                &format!("{}/{}", SNAPSHOTS, id),
                &[("expand", "volume".to_string())],
            )
            .await
    }

    pub async fn rename_snapshot(&self, id: &str, name: &str) -> Result<()> {
        self.client
            .patch(
                &format!("{}/{}/rename", SNAPSHOTS, id),
                &serde_json::json!({ "name": name }),
            )
            .await
    }

    pub async fn delete_snapshot(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("{}/{}", SNAPSHOTS, id), &[])
            .await
    }
}
