//! Compute (virtual machines) API client
//!
//! Covers instances, machine types, images, instance snapshots and the SSH
//! keys used to provision instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::common::{IdOrName, IdResponse, Results, page_query};
use crate::error::{Result, SdkError};
use crate::pagination::{DEFAULT_PAGE_LIMIT, paginate};

const INSTANCES: &str = "compute/v1/instances";
const INSTANCE_TYPES: &str = "compute/v1/instance-types";
const IMAGES: &str = "compute/v1/images";
const SNAPSHOTS: &str = "compute/v1/snapshots";
const SSH_KEYS: &str = "profile/v0/ssh-keys";

/// Expansions requested when reading instances
const INSTANCE_EXPAND: &str = "network,machine-type,image";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: Option<String>,
    pub machine_type: IdOrName,
    pub image: IdOrName,
    pub status: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub ssh_key_name: Option<String>,
    pub availability_zone: Option<String>,
    pub network: Option<InstanceNetwork>,
    pub user_data: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub error: Option<InstanceError>,
}

impl Instance {
    /// The primary network interface, if the instance has one
    pub fn primary_interface(&self) -> Option<&NetworkInterface> {
        let interfaces = &self.network.as_ref()?.interfaces;
        interfaces
            .iter()
            .find(|i| i.primary == Some(true))
            .or_else(|| interfaces.first())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstanceNetwork {
    pub vpc: Option<IdOrName>,
    #[serde(default)]
    pub interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkInterface {
    pub id: String,
    pub name: Option<String>,
    pub primary: Option<bool>,
    pub ip_addresses: Option<IpAddresses>,
    #[serde(default)]
    pub security_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IpAddresses {
    pub private_ipv4: Option<String>,
    pub public_ipv4: Option<String>,
    pub ipv6: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstanceError {
    pub message: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceCreateRequest {
    pub name: String,
    pub machine_type: IdOrName,
    pub image: IdOrName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<CreateNetwork>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl InstanceCreateRequest {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SdkError::validation("name", "must not be empty"));
        }
        if self.machine_type.id.is_none() && self.machine_type.name.is_none() {
            return Err(SdkError::validation("machine_type", "id or name is required"));
        }
        if self.image.id.is_none() && self.image.name.is_none() {
            return Err(SdkError::validation("image", "id or name is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateNetwork {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associate_public_ip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc: Option<IdOrName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<CreateInterface>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateInterface {
    pub security_groups: Vec<IdOrName>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MachineType {
    pub id: String,
    pub name: String,
    pub vcpus: i64,
    pub ram: i64,
    pub disk: i64,
    pub gpu: Option<i64>,
    pub status: String,
    #[serde(default)]
    pub availability_zones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
    pub status: String,
    pub version: Option<String>,
    pub platform: Option<String>,
    pub release_at: Option<String>,
    pub end_standard_support_at: Option<String>,
    pub minimum_requirements: Option<MinimumRequirements>,
    #[serde(default)]
    pub availability_zones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MinimumRequirements {
    pub vcpu: i64,
    pub ram: i64,
    pub disk: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub name: Option<String>,
    pub instance: Option<IdOrName>,
    pub size: Option<i64>,
    pub status: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SshKey {
    pub id: String,
    pub name: String,
    pub key: String,
    pub key_type: String,
}

#[derive(Deserialize)]
struct InstanceList {
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Deserialize)]
struct MachineTypeList {
    #[serde(default)]
    instance_types: Vec<MachineType>,
}

#[derive(Deserialize)]
struct ImageList {
    #[serde(default)]
    images: Vec<Image>,
}

/// Compute API client
#[derive(Debug, Clone)]
pub struct ComputeClient {
    client: Client,
}

impl ComputeClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    // =========================================================================
    // Instances
    // =========================================================================

    /// Create an instance and return its ID
    pub async fn create_instance(&self, request: &InstanceCreateRequest) -> Result<String> {
        request.validate()?;
        let created: IdResponse = self.client.post(INSTANCES, request).await?;
        Ok(created.id)
    }

    pub async fn get_instance(&self, id: &str) -> Result<Instance> {
        self.client
            .get(
                &format!("{}/{}", INSTANCES, id),
                &[("expand", INSTANCE_EXPAND.to_string())],
            )
            .await
    }

    pub async fn list_instances(&self, offset: u32, limit: u32) -> Result<Vec<Instance>> {
        let mut query = page_query(offset, limit);
        query.push(("expand", INSTANCE_EXPAND.to_string()));
        let list: InstanceList = self.client.get(INSTANCES, &query).await?;
        Ok(list.instances)
    }

    pub async fn list_all_instances(&self) -> Result<Vec<Instance>> {
        paginate(DEFAULT_PAGE_LIMIT, |offset, limit| {
            self.list_instances(offset, limit)
        })
        .await
    }

    pub async fn rename_instance(&self, id: &str, name: &str) -> Result<()> {
        self.client
            .patch(
                &format!("{}/{}/rename", INSTANCES, id),
                &serde_json::json!({ "name": name }),
            )
            .await
    }

    /// Change the machine type of a running instance
    pub async fn retype_instance(&self, id: &str, machine_type: &IdOrName) -> Result<()> {
        self.client
            .post_action(
                &format!("{}/{}/retype", INSTANCES, id),
                &serde_json::json!({ "machine_type": machine_type }),
            )
            .await
    }

    pub async fn delete_instance(&self, id: &str, delete_public_ip: bool) -> Result<()> {
        self.client
            .delete(
                &format!("{}/{}", INSTANCES, id),
                &[("delete_public_ip", delete_public_ip.to_string())],
            )
            .await
    }

    // =========================================================================
    // Machine types and images
    // =========================================================================

    pub async fn list_machine_types(&self) -> Result<Vec<MachineType>> {
        let list: MachineTypeList = self.client.get(INSTANCE_TYPES, &[]).await?;
        Ok(list.instance_types)
    }

    pub async fn list_images(&self) -> Result<Vec<Image>> {
        let list: ImageList = self.client.get(IMAGES, &[]).await?;
        Ok(list.images)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub async fn create_snapshot(&self, instance_id: &str, name: &str) -> Result<String> {
        if name.trim().is_empty() {
            return Err(SdkError::validation("name", "must not be empty"));
        }
        let created: IdResponse = self
            .client
            .post(
                SNAPSHOTS,
                &serde_json::json!({ "name": name, "instance": { "id": instance_id } }),
            )
            .await?;
        Ok(created.id)
    }

    pub async fn get_snapshot(&self, id: &str) -> Result<Snapshot> {
        self.client
            .get(
                &format!("{}/{}", SNAPSHOTS, id),
                &[("expand", "instance".to_string())],
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

    // =========================================================================
    // SSH keys
    // =========================================================================

    pub async fn create_ssh_key(&self, name: &str, key: &str) -> Result<SshKey> {
        if key.trim().is_empty() {
            return Err(SdkError::validation("key", "must not be empty"));
        }
        self.client
            .post(SSH_KEYS, &serde_json::json!({ "name": name, "key": key }))
            .await
    }

    pub async fn get_ssh_key(&self, id: &str) -> Result<SshKey> {
        self.client.get(&format!("{}/{}", SSH_KEYS, id), &[]).await
    }

    pub async fn list_ssh_keys(&self, offset: u32, limit: u32) -> Result<Vec<SshKey>> {
        let list: Results<SshKey> = self.client.get(SSH_KEYS, &page_query(offset, limit)).await?;
        Ok(list.results)
    }

    pub async fn list_all_ssh_keys(&self) -> Result<Vec<SshKey>> {
        paginate(DEFAULT_PAGE_LIMIT, |offset, limit| {
            self.list_ssh_keys(offset, limit)
        })
        .await
    }

    pub async fn delete_ssh_key(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("{}/{}", SSH_KEYS, id), &[]).await
    }
}
