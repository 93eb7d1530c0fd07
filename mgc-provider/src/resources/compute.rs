//! Virtual machine instances, SSH keys and instance snapshots

use async_trait::async_trait;
use log::info;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::ProviderResult;
use mgc_core::resource::Attributes;
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use mgc_sdk::common::IdOrName;
use mgc_sdk::compute::{
    ComputeClient, CreateInterface, CreateNetwork, Instance, InstanceCreateRequest,
};

use crate::adapter::{Configure, ResourceAdapter};
use crate::context::ConfigureRequest;
use crate::models::compute::{flatten_instance, flatten_snapshot, flatten_ssh_key};
use crate::schemas;
use crate::tfutil::{
    Poll, WaitConfig, carry_over, changed, ensure_unchanged, found, optional_bool, optional_str,
    required_str, sdk_error, string_list, wait_for,
};

/// Attributes only known from configuration
const INSTANCE_CONFIG_ONLY: &[&str] = &["associate_public_ip", "security_groups"];

fn instance_state(instance: &Instance) -> Poll {
    if instance.status.contains("error") || instance.state == "error" {
        return Poll::Failed(
            instance
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| format!("status {}", instance.status)),
        );
    }
    if instance.status == "completed" && instance.state == "running" {
        Poll::Ready
    } else {
        Poll::Pending
    }
}

// =============================================================================
// mgc_virtual_machine_instances
// =============================================================================

pub struct InstanceResource {
    compute: ComputeClient,
    wait: WaitConfig,
}

impl InstanceResource {
    async fn wait_running(&self, id: &str) -> ProviderResult<Instance> {
        wait_for(
            &self.wait,
            &format!("instance {}", id),
            || self.compute.get_instance(id),
            instance_state,
        )
        .await
    }
}

impl Configure for InstanceResource {
    const TYPE_NAME: &'static str = "mgc_virtual_machine_instances";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Virtual machine instance")
            .attribute(schemas::id())
            .attribute(schemas::name())
            .attribute(
                AttributeSchema::new("machine_type", AttributeType::String)
                    .required()
                    .with_description("Machine type name; changing it resizes the instance"),
            )
            .attribute(AttributeSchema::new("image", AttributeType::String).required())
            .attribute(AttributeSchema::new("ssh_key_name", AttributeType::String))
            .attribute(
                AttributeSchema::new("availability_zone", schemas::availability_zone())
                    .optional_computed(),
            )
            .attribute(AttributeSchema::new("vpc_id", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("associate_public_ip", AttributeType::Bool))
            .attribute(AttributeSchema::new("security_groups", schemas::string_list()))
            .attribute(AttributeSchema::new("user_data", AttributeType::String).sensitive())
            .attribute(AttributeSchema::new("labels", schemas::string_list()))
            .attributes([
                schemas::computed_string("machine_type_id"),
                schemas::computed_string("image_id"),
                schemas::computed_string("network_interface_id"),
                schemas::computed_string("private_ipv4"),
                schemas::computed_string("public_ipv4"),
                schemas::computed_string("ipv6"),
                schemas::computed_string("status"),
                schemas::computed_string("state"),
                schemas::computed_string("error"),
            ])
            .attributes(schemas::timestamps())
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let context = request.context()?;
        Ok(Self {
            compute: ComputeClient::new(context.client.clone()),
            wait: context.wait,
        })
    }
}

#[async_trait]
impl ResourceAdapter for InstanceResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let instance = found(self.compute.get_instance(identifier).await)?;
        Ok(instance.as_ref().map(flatten_instance))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let security_groups = string_list(config, "security_groups").unwrap_or_default();
        let associate_public_ip = optional_bool(config, "associate_public_ip");
        let vpc_id = optional_str(config, "vpc_id");
        let network = if associate_public_ip.is_some() || vpc_id.is_some() || !security_groups.is_empty() {
            Some(CreateNetwork {
                associate_public_ip,
                vpc: vpc_id.map(IdOrName::id),
                interface: (!security_groups.is_empty()).then(|| CreateInterface {
                    security_groups: security_groups.into_iter().map(IdOrName::id).collect(),
                }),
            })
        } else {
            None
        };

        let request = InstanceCreateRequest {
            name: required_str(config, "name")?,
            machine_type: IdOrName::name(required_str(config, "machine_type")?),
            image: IdOrName::name(required_str(config, "image")?),
            ssh_key_name: optional_str(config, "ssh_key_name"),
            availability_zone: optional_str(config, "availability_zone"),
            network,
            user_data: optional_str(config, "user_data"),
            labels: string_list(config, "labels").unwrap_or_default(),
        };

        let id = self.compute.create_instance(&request).await.map_err(sdk_error)?;
        info!("created instance {}", id);
        let instance = self.wait_running(&id).await?;
        let attrs = carry_over(flatten_instance(&instance), config, INSTANCE_CONFIG_ONLY);
        Ok((id, attrs))
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
            &[
                "image",
                "ssh_key_name",
                "availability_zone",
                "vpc_id",
                "associate_public_ip",
                "security_groups",
                "user_data",
                "labels",
            ],
        )?;

        if changed(from, to, "name") {
            let name = required_str(to, "name")?;
            self.compute
                .rename_instance(identifier, &name)
                .await
                .map_err(sdk_error)?;
        }
        if changed(from, to, "machine_type") {
            let machine_type = IdOrName::name(required_str(to, "machine_type")?);
            self.compute
                .retype_instance(identifier, &machine_type)
                .await
                .map_err(sdk_error)?;
        }

        let instance = self.wait_running(identifier).await?;
        Ok(carry_over(flatten_instance(&instance), to, INSTANCE_CONFIG_ONLY))
    }

    async fn delete(&self, identifier: &str, state: &Attributes) -> ProviderResult<()> {
        let delete_public_ip = optional_bool(state, "associate_public_ip").unwrap_or(false);
        self.compute
            .delete_instance(identifier, delete_public_ip)
            .await
            .map_err(sdk_error)
    }
}

// =============================================================================
// mgc_ssh_keys
// =============================================================================

pub struct SshKeyResource {
    compute: ComputeClient,
}

impl Configure for SshKeyResource {
    const TYPE_NAME: &'static str = "mgc_ssh_keys";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("SSH public key used to access instances")
            .attribute(schemas::id())
            .attribute(schemas::name())
            .attribute(
                AttributeSchema::new("key", AttributeType::String)
                    .required()
                    .with_description("Public key in OpenSSH format"),
            )
            .attribute(schemas::computed_string("key_type"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let context = request.context()?;
        Ok(Self {
            compute: ComputeClient::new(context.client.clone()),
        })
    }
}

#[async_trait]
impl ResourceAdapter for SshKeyResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let key = found(self.compute.get_ssh_key(identifier).await)?;
        Ok(key.as_ref().map(flatten_ssh_key))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let key = self
            .compute
            .create_ssh_key(&required_str(config, "name")?, &required_str(config, "key")?)
            .await
            .map_err(sdk_error)?;
        Ok((key.id.clone(), flatten_ssh_key(&key)))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, &["name", "key"])?;
        let key = self
            .compute
            .get_ssh_key(identifier)
            .await
            .map_err(sdk_error)?;
        Ok(flatten_ssh_key(&key))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.compute
            .delete_ssh_key(identifier)
            .await
            .map_err(sdk_error)
    }
}

// =============================================================================
// mgc_virtual_machine_snapshots
// =============================================================================

pub struct InstanceSnapshotResource {
    compute: ComputeClient,
}

impl Configure for InstanceSnapshotResource {
    const TYPE_NAME: &'static str = "mgc_virtual_machine_snapshots";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Snapshot of a virtual machine instance")
            .attribute(schemas::id())
            .attribute(schemas::name())
            .attribute(AttributeSchema::new("instance_id", AttributeType::String).required())
            .attributes([
                schemas::computed_int("size"),
                schemas::computed_string("status"),
                schemas::computed_string("state"),
            ])
            .attributes(schemas::timestamps())
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let context = request.context()?;
        Ok(Self {
            compute: ComputeClient::new(context.client.clone()),
        })
    }
}

#[async_trait]
impl ResourceAdapter for InstanceSnapshotResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let snapshot = found(self.compute.get_snapshot(identifier).await)?;
        Ok(snapshot.as_ref().map(flatten_snapshot))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let id = self
            .compute
            .create_snapshot(
                &required_str(config, "instance_id")?,
                &required_str(config, "name")?,
            )
            .await
            .map_err(sdk_error)?;
        let snapshot = self.compute.get_snapshot(&id).await.map_err(sdk_error)?;
        Ok((id, flatten_snapshot(&snapshot)))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, &["instance_id"])?;
        if changed(from, to, "name") {
            self.compute
                .rename_snapshot(identifier, &required_str(to, "name")?)
                .await
                .map_err(sdk_error)?;
        }
        let snapshot = self
            .compute
            .get_snapshot(identifier)
            .await
            .map_err(sdk_error)?;
        Ok(flatten_snapshot(&snapshot))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.compute
            .delete_snapshot(identifier)
            .await
            .map_err(sdk_error)
    }
}
