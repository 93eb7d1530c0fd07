//! Database-as-a-service API client
//!
//! Listings use a `{meta, results}` envelope with `offset`/`limit` query
//! parameters and are collected with [`paginate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::common::IdResponse;
use crate::error::{Result, SdkError};
use crate::pagination::{DEFAULT_PAGE_LIMIT, paginate};

const BASE: &str = "database/v2";

/// Minimum accepted length for the admin password
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub engine_id: String,
    pub instance_type_id: String,
    pub status: String,
    pub volume: Volume,
    pub backup_retention_days: i32,
    pub backup_start_at: Option<String>,
    pub availability_zone: Option<String>,
    pub parameter_group_id: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub engine_id: String,
    pub instance_type_id: String,
    pub status: String,
    pub volume: Volume,
    pub backup_retention_days: i32,
    pub backup_start_at: Option<String>,
    pub parameter_group_id: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub size: i64,
    #[serde(rename = "type")]
    pub volume_type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Address {
    pub access: String,
    #[serde(rename = "type")]
    pub address_type: Option<String>,
    pub address: Option<String>,
    pub port: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Engine {
    pub id: String,
    pub name: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstanceType {
    pub id: String,
    pub name: String,
    pub label: Option<String>,
    pub family_slug: Option<String>,
    pub family_description: Option<String>,
    pub vcpu: String,
    pub ram: String,
    pub size: Option<String>,
    pub compatible_product: Option<String>,
    pub status: Option<String>,
}

/// Body shared by instance and cluster creation
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseCreateRequest {
    pub name: String,
    pub engine_id: String,
    pub instance_type_id: String,
    pub user: String,
    pub password: String,
    pub volume: Volume,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_retention_days: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_start_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_group_id: Option<String>,
}

impl DatabaseCreateRequest {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SdkError::validation("name", "must not be empty"));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(SdkError::validation(
                "password",
                format!("must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }
        if matches!(self.backup_retention_days, Some(days) if days < 0) {
            return Err(SdkError::validation(
                "backup_retention_days",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Fields that can be changed on an existing instance or cluster
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_retention_days: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_start_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_group_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResizeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

fn page_query(offset: u32, limit: u32) -> Vec<(&'static str, String)> {
    vec![("offset", offset.to_string()), ("limit", limit.to_string())]
}

/// DBaaS API client
#[derive(Debug, Clone)]
pub struct DbaasClient {
    client: Client,
}

impl DbaasClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn list_page<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<T>> {
        let page: Page<T> = self
            .client
            .get(
                &format!("{}/{}", BASE, resource),
                &page_query(offset, limit),
            )
            .await?;
        Ok(page.results)
    }

    async fn list_all<T: serde::de::DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>> {
        paginate(DEFAULT_PAGE_LIMIT, |offset, limit| {
            self.list_page(resource, offset, limit)
        })
        .await
    }

    // =========================================================================
    // Instances
    // =========================================================================

    pub async fn create_instance(&self, request: &DatabaseCreateRequest) -> Result<String> {
        request.validate()?;
        let created: IdResponse = self
            .client
            .post(&format!("{}/instances", BASE), request)
            .await?;
        Ok(created.id)
    }

    pub async fn get_instance(&self, id: &str) -> Result<Instance> {
        self.client
            .get(&format!("{}/instances/{}", BASE, id), &[])
            .await
    }

    pub async fn list_instances(&self, offset: u32, limit: u32) -> Result<Vec<Instance>> {
        self.list_page("instances", offset, limit).await
    }

    pub async fn list_all_instances(&self) -> Result<Vec<Instance>> {
        self.list_all("instances").await
    }

    pub async fn update_instance(&self, id: &str, request: &DatabaseUpdateRequest) -> Result<()> {
        self.client
            .patch(&format!("{}/instances/{}", BASE, id), request)
            .await
    }

    pub async fn resize_instance(&self, id: &str, request: &ResizeRequest) -> Result<()> {
        self.client
            .post_action(&format!("{}/instances/{}/resize", BASE, id), request)
            .await
    }

    pub async fn delete_instance(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("{}/instances/{}", BASE, id), &[])
            .await
    }

    // =========================================================================
    // Clusters
    // =========================================================================

    pub async fn create_cluster(&self, request: &DatabaseCreateRequest) -> Result<String> {
        request.validate()?;
        let created: IdResponse = self
            .client
            .post(&format!("{}/clusters", BASE), request)
            .await?;
        Ok(created.id)
    }

    pub async fn get_cluster(&self, id: &str) -> Result<Cluster> {
        self.client
            .get(&format!("{}/clusters/{}", BASE, id), &[])
            .await
    }

    pub async fn list_clusters(&self, offset: u32, limit: u32) -> Result<Vec<Cluster>> {
        self.list_page("clusters", offset, limit).await
    }

    pub async fn list_all_clusters(&self) -> Result<Vec<Cluster>> {
        self.list_all("clusters").await
    }

    pub async fn update_cluster(&self, id: &str, request: &DatabaseUpdateRequest) -> Result<()> {
        self.client
            .patch(&format!("{}/clusters/{}", BASE, id), request)
            .await
    }

    pub async fn resize_cluster(&self, id: &str, request: &ResizeRequest) -> Result<()> {
        self.client
            .post_action(&format!("{}/clusters/{}/resize", BASE, id), request)
            .await
    }

    pub async fn delete_cluster(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("{}/clusters/{}", BASE, id), &[])
            .await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn list_engines(&self) -> Result<Vec<Engine>> {
        self.list_all("engines").await
    }

    pub async fn list_instance_types(&self) -> Result<Vec<InstanceType>> {
        self.list_all("instance-types").await
    }
}
