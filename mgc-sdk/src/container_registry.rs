//! Container registry API client

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::client::Client;
use crate::common::{IdResponse, Results, page_query};
use crate::error::{Result, SdkError};
use crate::pagination::{DEFAULT_PAGE_LIMIT, paginate};

const BASE: &str = "container-registry/v0";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Registry {
    pub id: String,
    pub name: String,
    pub storage_usage_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Repository {
    pub registry_name: String,
    pub name: String,
    pub image_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Registry names: lowercase alphanumerics, `-`, `_` and `.`, starting with
/// an alphanumeric, at most 63 characters
pub fn validate_registry_name(name: &str) -> Result<()> {
    let valid_start = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));
    if !valid_start || !valid_chars || name.len() > 63 {
        return Err(SdkError::validation(
            "name",
            format!(
                "'{}' must start with a lowercase letter or digit and contain only [a-z0-9._-], at most 63 characters",
                name
            ),
        ));
    }
    Ok(())
}

/// Container registry API client
#[derive(Debug, Clone)]
pub struct ContainerRegistryClient {
    client: Client,
}

impl ContainerRegistryClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn create_registry(&self, name: &str) -> Result<String> {
        validate_registry_name(name)?;
        let created: IdResponse = self
            .client
            .post(
                &format!("{}/registries", BASE),
                &serde_json::json!({ "name": name }),
            )
            .await?;
        Ok(created.id)
    }

    pub async fn get_registry(&self, id: &str) -> Result<Registry> {
        self.client
            .get(&format!("{}/registries/{}", BASE, id), &[])
            .await
    }

    pub async fn list_registries(&self, offset: u32, limit: u32) -> Result<Vec<Registry>> {
        let list: Results<Registry> = self
            .client
            .get(
                &format!("{}/registries", BASE),
                &page_query(offset, limit),
            )
            .await?;
        Ok(list.results)
    }

    pub async fn list_all_registries(&self) -> Result<Vec<Registry>> {
        paginate(DEFAULT_PAGE_LIMIT, |offset, limit| {
            self.list_registries(offset, limit)
        })
        .await
    }

    pub async fn delete_registry(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("{}/registries/{}", BASE, id), &[])
            .await
    }

    /// Docker login credentials for the tenant
    pub async fn get_credentials(&self) -> Result<Credentials> {
        self.client
            .get(&format!("{}/credentials", BASE), &[])
            .await
    }

    pub async fn list_repositories(
        &self,
        registry_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Repository>> {
        let list: Results<Repository> = self
            .client
            .get(
                &format!("{}/registries/{}/repositories", BASE, registry_id),
                &page_query(offset, limit),
            )
            .await?;
        Ok(list.results)
    }

    pub async fn list_all_repositories(&self, registry_id: &str) -> Result<Vec<Repository>> {
        paginate(DEFAULT_PAGE_LIMIT, |offset, limit| {
            self.list_repositories(registry_id, offset, limit)
        })
        .await
    }
}
