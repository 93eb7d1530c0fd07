//! Database instances and clusters
//!
//! Both share one request shape. Instance type and volume size change
//! through a resize; backup settings and parameter group through a patch.

use async_trait::async_trait;
use log::info;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::{ProviderError, ProviderResult};
use mgc_core::resource::Attributes;
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use mgc_sdk::dbaas::{
    DatabaseCreateRequest, DatabaseUpdateRequest, DbaasClient, ResizeRequest, Volume,
};

use crate::adapter::{Configure, ResourceAdapter};
use crate::context::ConfigureRequest;
use crate::models::dbaas::{flatten_cluster, flatten_instance};
use crate::schemas;
use crate::tfutil::{
    Poll, WaitConfig, carry_over, changed, ensure_unchanged, found, i64_ptr_to_int_ptr,
    optional_int, optional_str, required_int, required_str, sdk_error, wait_for,
};

/// Credentials are write-only in the API
const CREDENTIALS: &[&str] = &["user", "password"];

const DEFAULT_VOLUME_TYPE: &str = "CLOUD_NVME15K";

fn active(status: &str) -> Poll {
    match status.to_ascii_uppercase().as_str() {
        "ACTIVE" => Poll::Ready,
        "ERROR" | "ERROR_DELETION" => Poll::Failed(format!("status {}", status)),
        _ => Poll::Pending,
    }
}

fn dbaas(request: ConfigureRequest<'_>) -> Result<(DbaasClient, WaitConfig), Diagnostic> {
    let context = request.context()?;
    Ok((DbaasClient::new(context.client.clone()), context.wait))
}

fn base_schema(type_name: &str, description: &str) -> ResourceSchema {
    ResourceSchema::new(type_name)
        .with_description(description)
        .attribute(schemas::id())
        .attribute(schemas::name())
        .attribute(AttributeSchema::new("user", AttributeType::String).required())
        .attribute(
            AttributeSchema::new("password", AttributeType::String)
                .required()
                .sensitive(),
        )
        .attribute(AttributeSchema::new("engine_id", AttributeType::String).required())
        .attribute(
            AttributeSchema::new("instance_type_id", AttributeType::String)
                .required()
                .with_description("Changing it resizes the database"),
        )
        .attribute(
            AttributeSchema::new("volume_size", types::positive_int())
                .required()
                .with_description("Size in GiB; can only grow"),
        )
        .attribute(AttributeSchema::new("volume_type", AttributeType::String).optional_computed())
        .attribute(
            AttributeSchema::new("backup_retention_days", AttributeType::Int).optional_computed(),
        )
        .attribute(
            AttributeSchema::new("backup_start_at", AttributeType::String)
                .optional_computed()
                .with_description("Daily backup time, HH:MM:SS"),
        )
        .attribute(
            AttributeSchema::new("parameter_group_id", AttributeType::String).optional_computed(),
        )
        .attributes([
            schemas::computed_string("status"),
            schemas::computed_list(
                "addresses",
                schemas::computed_object([
                    schemas::computed_string("access"),
                    schemas::computed_string("type"),
                    schemas::computed_string("address"),
                    schemas::computed_string("port"),
                ]),
            ),
            schemas::computed_string("finished_at"),
        ])
        .attributes(schemas::timestamps())
}

fn backup_retention_days(config: &Attributes) -> ProviderResult<Option<i32>> {
    let days = optional_int(config, "backup_retention_days");
    match i64_ptr_to_int_ptr(days) {
        None if days.is_some() => Err(ProviderError::new("Value out of range")
            .with_detail("'backup_retention_days' does not fit a 32-bit integer")),
        narrowed => Ok(narrowed),
    }
}

fn create_request(config: &Attributes) -> ProviderResult<DatabaseCreateRequest> {
    Ok(DatabaseCreateRequest {
        name: required_str(config, "name")?,
        engine_id: required_str(config, "engine_id")?,
        instance_type_id: required_str(config, "instance_type_id")?,
        user: required_str(config, "user")?,
        password: required_str(config, "password")?,
        volume: Volume {
            size: required_int(config, "volume_size")?,
            volume_type: optional_str(config, "volume_type")
                .unwrap_or_else(|| DEFAULT_VOLUME_TYPE.to_string()),
        },
        backup_retention_days: backup_retention_days(config)?,
        backup_start_at: optional_str(config, "backup_start_at"),
        availability_zone: optional_str(config, "availability_zone"),
        parameter_group_id: optional_str(config, "parameter_group_id"),
    })
}

/// Patch covering whichever mutable settings changed
fn update_request(from: &Attributes, to: &Attributes) -> ProviderResult<Option<DatabaseUpdateRequest>> {
    let mut request = DatabaseUpdateRequest::default();
    let mut any = false;
    if changed(from, to, "backup_retention_days") {
        request.backup_retention_days = backup_retention_days(to)?;
        any = true;
    }
    if changed(from, to, "backup_start_at") {
        request.backup_start_at = optional_str(to, "backup_start_at");
        any = true;
    }
    if changed(from, to, "parameter_group_id") {
        request.parameter_group_id = optional_str(to, "parameter_group_id");
        any = true;
    }
    Ok(any.then_some(request))
}

/// Resize covering instance type and volume growth
fn resize_request(from: &Attributes, to: &Attributes) -> ProviderResult<Option<ResizeRequest>> {
    let mut request = ResizeRequest::default();
    if changed(from, to, "instance_type_id") {
        request.instance_type_id = optional_str(to, "instance_type_id");
    }
    if changed(from, to, "volume_size") || changed(from, to, "volume_type") {
        let size = required_int(to, "volume_size")?;
        if let Some(current) = optional_int(from, "volume_size")
            && size < current
        {
            return Err(ProviderError::new("Volume cannot shrink").with_detail(format!(
                "volume_size can only grow, from {} to {} GiB requested",
                current, size
            )));
        }
        request.volume = Some(Volume {
            size,
            volume_type: optional_str(to, "volume_type")
                .or_else(|| optional_str(from, "volume_type"))
                .unwrap_or_else(|| DEFAULT_VOLUME_TYPE.to_string()),
        });
    }
    Ok((request.instance_type_id.is_some() || request.volume.is_some()).then_some(request))
}

// =============================================================================
// mgc_dbaas_instances
// =============================================================================

pub struct DatabaseInstanceResource {
    dbaas: DbaasClient,
    wait: WaitConfig,
}

impl Configure for DatabaseInstanceResource {
    const TYPE_NAME: &'static str = "mgc_dbaas_instances";

    fn schema() -> ResourceSchema {
        base_schema(Self::TYPE_NAME, "Single-node database instance").attribute(
            AttributeSchema::new("availability_zone", schemas::availability_zone())
                .optional_computed(),
        )
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (dbaas, wait) = dbaas(request)?;
        Ok(Self { dbaas, wait })
    }
}

impl DatabaseInstanceResource {
    async fn wait_active(&self, id: &str) -> ProviderResult<Attributes> {
        let instance = wait_for(
            &self.wait,
            &format!("database instance {}", id),
            || self.dbaas.get_instance(id),
            |i| active(&i.status),
        )
        .await?;
        Ok(flatten_instance(&instance))
    }
}

#[async_trait]
impl ResourceAdapter for DatabaseInstanceResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let instance = found(self.dbaas.get_instance(identifier).await)?;
        Ok(instance.as_ref().map(flatten_instance))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let id = self
            .dbaas
            .create_instance(&create_request(config)?)
            .await
            .map_err(sdk_error)?;
        info!("created database instance {}", id);
        let attrs = self.wait_active(&id).await?;
        Ok((id, carry_over(attrs, config, CREDENTIALS)))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(
            from,
            to,
            &["name", "user", "password", "engine_id", "availability_zone"],
        )?;
        if let Some(resize) = resize_request(from, to)? {
            self.dbaas
                .resize_instance(identifier, &resize)
                .await
                .map_err(sdk_error)?;
            self.wait_active(identifier).await?;
        }
        if let Some(patch) = update_request(from, to)? {
            self.dbaas
                .update_instance(identifier, &patch)
                .await
                .map_err(sdk_error)?;
        }
        let attrs = self.wait_active(identifier).await?;
        Ok(carry_over(attrs, to, CREDENTIALS))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.dbaas
            .delete_instance(identifier)
            .await
            .map_err(sdk_error)
    }
}

// =============================================================================
// mgc_dbaas_clusters
// =============================================================================

pub struct DatabaseClusterResource {
    dbaas: DbaasClient,
    wait: WaitConfig,
}

impl Configure for DatabaseClusterResource {
    const TYPE_NAME: &'static str = "mgc_dbaas_clusters";

    fn schema() -> ResourceSchema {
        base_schema(Self::TYPE_NAME, "Replicated database cluster")
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (dbaas, wait) = dbaas(request)?;
        Ok(Self { dbaas, wait })
    }
}

impl DatabaseClusterResource {
    async fn wait_active(&self, id: &str) -> ProviderResult<Attributes> {
        let cluster = wait_for(
            &self.wait,
            &format!("database cluster {}", id),
            || self.dbaas.get_cluster(id),
            |c| active(&c.status),
        )
        .await?;
        Ok(flatten_cluster(&cluster))
    }
}

#[async_trait]
impl ResourceAdapter for DatabaseClusterResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let cluster = found(self.dbaas.get_cluster(identifier).await)?;
        Ok(cluster.as_ref().map(flatten_cluster))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let id = self
            .dbaas
            .create_cluster(&create_request(config)?)
            .await
            .map_err(sdk_error)?;
        info!("created database cluster {}", id);
        let attrs = self.wait_active(&id).await?;
        Ok((id, carry_over(attrs, config, CREDENTIALS)))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, &["name", "user", "password", "engine_id"])?;
        if let Some(resize) = resize_request(from, to)? {
            self.dbaas
                .resize_cluster(identifier, &resize)
                .await
                .map_err(sdk_error)?;
            self.wait_active(identifier).await?;
        }
        if let Some(patch) = update_request(from, to)? {
            self.dbaas
                .update_cluster(identifier, &patch)
                .await
                .map_err(sdk_error)?;
        }
        let attrs = self.wait_active(identifier).await?;
        Ok(carry_over(attrs, to, CREDENTIALS))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.dbaas
            .delete_cluster(identifier)
            .await
            .map_err(sdk_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProviderData;
    use crate::context::tests::context_for;
    use crate::tfutil::attributes;
    use mgc_core::resource::Value;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn instance_json(status: &str, instance_type_id: &str) -> serde_json::Value {
        json!({
            "id": "db-1",
            "name": "orders",
            "engine_id": "e-1",
            "instance_type_id": instance_type_id,
            "status": status,
            "volume": {"size": 20, "type": "CLOUD_NVME15K"},
            "backup_retention_days": 7,
            "created_at": "2024-05-01T10:00:00Z"
        })
    }

    #[test]
    fn untouched_settings_send_no_requests() {
        let state = attributes([
            ("instance_type_id", Value::from("it-1")),
            ("volume_size", Value::from(20i64)),
        ]);
        assert!(resize_request(&state, &state).unwrap().is_none());
        assert!(update_request(&state, &state).unwrap().is_none());
    }

    #[test]
    fn volume_growth_keeps_type() {
        let from = attributes([
            ("volume_size", Value::from(20i64)),
            ("volume_type", Value::from("CLOUD_NVME20K")),
        ]);
        let to = attributes([("volume_size", Value::from(40i64))]);
        let resize = resize_request(&from, &to).unwrap().unwrap();
        assert_eq!(
            resize.volume,
            Some(Volume {
                size: 40,
                volume_type: "CLOUD_NVME20K".into()
            })
        );
        assert_eq!(resize.instance_type_id, None);

        let shrink = attributes([("volume_size", Value::from(10i64))]);
        assert_eq!(
            resize_request(&from, &shrink).unwrap_err().message,
            "Volume cannot shrink"
        );
    }

    #[tokio::test]
    async fn password_stays_in_state_but_is_never_read_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/database/v2/instances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "db-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/database/v2/instances/db-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(instance_json("ACTIVE", "it-1")))
            .mount(&server)
            .await;

        let data: ProviderData = context_for(&server.uri());
        let resource =
            DatabaseInstanceResource::configure(ConfigureRequest::resource(&data)).unwrap();
        let config = attributes([
            ("name", Value::from("orders")),
            ("user", Value::from("admin")),
            ("password", Value::from("s3cr3t-pass")),
            ("engine_id", Value::from("e-1")),
            ("instance_type_id", Value::from("it-1")),
            ("volume_size", Value::from(20i64)),
        ]);
        let (id, attrs) = resource.create(&config).await.unwrap();
        assert_eq!(id, "db-1");
        assert_eq!(attrs["password"], Value::from("s3cr3t-pass"));
        assert_eq!(attrs["status"], Value::from("ACTIVE"));
    }

    #[tokio::test]
    async fn short_password_is_rejected_before_the_request() {
        let server = MockServer::start().await;
        let data: ProviderData = context_for(&server.uri());
        let resource =
            DatabaseClusterResource::configure(ConfigureRequest::resource(&data)).unwrap();
        let config = attributes([
            ("name", Value::from("orders")),
            ("user", Value::from("admin")),
            ("password", Value::from("short")),
            ("engine_id", Value::from("e-1")),
            ("instance_type_id", Value::from("it-1")),
            ("volume_size", Value::from(20i64)),
        ]);
        let err = resource.create(&config).await.unwrap_err();
        assert_eq!(err.message, "Request validation failed");
        assert_eq!(err.detail.as_deref(), Some("Field: password, Message: must be at least 8 characters"));
    }

    #[tokio::test]
    async fn instance_type_change_resizes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/database/v2/instances/db-1/resize"))
            .and(body_json(json!({"instance_type_id": "it-2"})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/database/v2/instances/db-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(instance_json("ACTIVE", "it-2")))
            .mount(&server)
            .await;

        let data: ProviderData = context_for(&server.uri());
        let resource =
            DatabaseInstanceResource::configure(ConfigureRequest::resource(&data)).unwrap();
        let attrs = resource
            .update(
                "db-1",
                &attributes([("instance_type_id", Value::from("it-1"))]),
                &attributes([("instance_type_id", Value::from("it-2"))]),
            )
            .await
            .unwrap();
        assert_eq!(attrs["instance_type_id"], Value::from("it-2"));
    }
}
