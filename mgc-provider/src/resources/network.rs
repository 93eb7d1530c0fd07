//! VPCs, subnets, security groups, security group rules and public IPs

use async_trait::async_trait;
use log::{debug, info};
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::ProviderResult;
use mgc_core::resource::Attributes;
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use mgc_sdk::network::{NetworkClient, Rule, SubnetCreateRequest};

use crate::adapter::{Configure, ResourceAdapter};
use crate::context::ConfigureRequest;
use crate::models::network::{
    flatten_public_ip, flatten_rule, flatten_security_group, flatten_subnet, flatten_vpc,
};
use crate::schemas;
use crate::tfutil::{
    Poll, WaitConfig, carry_over, changed, ensure_unchanged, found, optional_bool, optional_int,
    optional_str, required_str, sdk_error, string_list, wait_for,
};

/// Network objects report "created" once provisioned
fn created(status: &str, error: Option<&str>) -> Poll {
    match status {
        "created" => Poll::Ready,
        "error" => Poll::Failed(error.unwrap_or("status error").to_string()),
        _ => Poll::Pending,
    }
}

fn network(request: ConfigureRequest<'_>) -> Result<(NetworkClient, WaitConfig), Diagnostic> {
    let context = request.context()?;
    Ok((NetworkClient::new(context.client.clone()), context.wait))
}

// =============================================================================
// mgc_network_vpcs
// =============================================================================

pub struct VpcResource {
    network: NetworkClient,
    wait: WaitConfig,
}

impl Configure for VpcResource {
    const TYPE_NAME: &'static str = "mgc_network_vpcs";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Virtual private cloud")
            .attribute(schemas::id())
            .attribute(schemas::name())
            .attribute(schemas::description())
            .attributes([
                schemas::computed_string("status"),
                schemas::computed_bool("is_default"),
                schemas::computed_string("tenant_id"),
                schemas::computed_string("router_id"),
                schemas::computed_string("external_network"),
                schemas::computed_list("subnets", AttributeType::String),
                schemas::computed_list("security_groups", AttributeType::String),
            ])
            .attributes(schemas::timestamps())
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (network, wait) = network(request)?;
        Ok(Self { network, wait })
    }
}

#[async_trait]
impl ResourceAdapter for VpcResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let vpc = found(self.network.get_vpc(identifier).await)?;
        Ok(vpc.as_ref().map(flatten_vpc))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let description = optional_str(config, "description");
        let id = self
            .network
            .create_vpc(&required_str(config, "name")?, description.as_deref())
            .await
            .map_err(sdk_error)?;
        info!("created vpc {}", id);

        let vpc = wait_for(
            &self.wait,
            &format!("vpc {}", id),
            || self.network.get_vpc(&id),
            |vpc| created(&vpc.status, None),
        )
        .await?;
        Ok((id, flatten_vpc(&vpc)))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, &["name", "description"])?;
        let vpc = self.network.get_vpc(identifier).await.map_err(sdk_error)?;
        Ok(flatten_vpc(&vpc))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.network.delete_vpc(identifier).await.map_err(sdk_error)
    }
}

// =============================================================================
// mgc_network_vpcs_subnets
// =============================================================================

pub struct SubnetResource {
    network: NetworkClient,
}

impl Configure for SubnetResource {
    const TYPE_NAME: &'static str = "mgc_network_vpcs_subnets";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Subnet of a VPC")
            .attribute(schemas::id())
            .attribute(schemas::name())
            .attribute(schemas::description())
            .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
            .attribute(AttributeSchema::new("cidr_block", types::cidr()).required())
            .attribute(AttributeSchema::new("ip_version", schemas::ip_version()).required())
            .attribute(
                AttributeSchema::new("dns_nameservers", schemas::string_list())
                    .optional_computed()
                    .with_description("DNS servers handed out by DHCP; updated in place"),
            )
            .attribute(AttributeSchema::new("subnetpool_id", AttributeType::String).optional_computed())
            .attributes([
                schemas::computed_string("gateway_ip"),
                schemas::computed_string("availability_zone"),
                schemas::computed_string("created_at"),
            ])
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (network, _) = network(request)?;
        Ok(Self { network })
    }
}

#[async_trait]
impl ResourceAdapter for SubnetResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let subnet = found(self.network.get_subnet(identifier).await)?;
        Ok(subnet.as_ref().map(flatten_subnet))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let vpc_id = required_str(config, "vpc_id")?;
        let request = SubnetCreateRequest {
            name: required_str(config, "name")?,
            cidr_block: required_str(config, "cidr_block")?,
            ip_version: required_str(config, "ip_version")?,
            description: optional_str(config, "description"),
            dns_nameservers: string_list(config, "dns_nameservers").unwrap_or_default(),
            subnetpool_id: optional_str(config, "subnetpool_id"),
        };
        let id = self
            .network
            .create_subnet(&vpc_id, &request)
            .await
            .map_err(sdk_error)?;
        info!("created subnet {} in vpc {}", id, vpc_id);

        let subnet = self.network.get_subnet(&id).await.map_err(sdk_error)?;
        Ok((id, flatten_subnet(&subnet)))
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
                "name",
                "description",
                "vpc_id",
                "cidr_block",
                "ip_version",
                "subnetpool_id",
            ],
        )?;
        if changed(from, to, "dns_nameservers") {
            let servers = string_list(to, "dns_nameservers").unwrap_or_default();
            self.network
                .update_subnet_dns(identifier, &servers)
                .await
                .map_err(sdk_error)?;
        }
        let subnet = self.network.get_subnet(identifier).await.map_err(sdk_error)?;
        Ok(flatten_subnet(&subnet))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.network.delete_subnet(identifier).await.map_err(sdk_error)
    }
}

// =============================================================================
// mgc_network_security_groups
// =============================================================================

pub struct SecurityGroupResource {
    network: NetworkClient,
    wait: WaitConfig,
}

impl Configure for SecurityGroupResource {
    const TYPE_NAME: &'static str = "mgc_network_security_groups";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Security group")
            .attribute(schemas::id())
            .attribute(schemas::name())
            .attribute(schemas::description())
            .attribute(
                AttributeSchema::new("disable_default_rules", AttributeType::Bool)
                    .with_description("Remove the rules the cloud adds to new groups"),
            )
            .attributes([
                schemas::computed_string("vpc_id"),
                schemas::computed_string("status"),
                schemas::computed_string("error"),
                schemas::computed_bool("is_default"),
                schemas::computed_list(
                    "rules",
                    schemas::object_of(SecurityGroupRuleResource::schema()),
                ),
            ])
            .attributes(schemas::timestamps())
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (network, wait) = network(request)?;
        Ok(Self { network, wait })
    }
}

#[async_trait]
impl ResourceAdapter for SecurityGroupResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let group = found(self.network.get_security_group(identifier).await)?;
        Ok(group.as_ref().map(flatten_security_group))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let description = optional_str(config, "description");
        let skip_default_rules = optional_bool(config, "disable_default_rules").unwrap_or(false);
        let id = self
            .network
            .create_security_group(
                &required_str(config, "name")?,
                description.as_deref(),
                skip_default_rules,
            )
            .await
            .map_err(sdk_error)?;
        info!("created security group {}", id);

        let group = wait_for(
            &self.wait,
            &format!("security group {}", id),
            || self.network.get_security_group(&id),
            |g| created(&g.status, g.error.as_deref()),
        )
        .await?;
        let attrs = carry_over(flatten_security_group(&group), config, &["disable_default_rules"]);
        Ok((id, attrs))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, &["name", "description", "disable_default_rules"])?;
        let group = self
            .network
            .get_security_group(identifier)
            .await
            .map_err(sdk_error)?;
        Ok(carry_over(flatten_security_group(&group), to, &["disable_default_rules"]))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.network
            .delete_security_group(identifier)
            .await
            .map_err(sdk_error)
    }
}

// =============================================================================
// mgc_network_security_groups_rules
// =============================================================================

/// Rules have no update endpoint; every argument requires replacement
const RULE_ARGUMENTS: &[&str] = &[
    "security_group_id",
    "direction",
    "ethertype",
    "protocol",
    "port_range_min",
    "port_range_max",
    "remote_ip_prefix",
    "remote_group_id",
    "description",
];

pub struct SecurityGroupRuleResource {
    network: NetworkClient,
}

impl Configure for SecurityGroupRuleResource {
    const TYPE_NAME: &'static str = "mgc_network_security_groups_rules";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Rule of a security group")
            .attribute(schemas::id())
            .attribute(
                AttributeSchema::new("security_group_id", AttributeType::String).required(),
            )
            .attribute(
                AttributeSchema::new(
                    "direction",
                    AttributeType::Enum(vec!["ingress".into(), "egress".into()]),
                )
                .required(),
            )
            .attribute(AttributeSchema::new("ethertype", schemas::ip_version()).required())
            .attribute(AttributeSchema::new("protocol", AttributeType::String))
            .attribute(AttributeSchema::new("port_range_min", types::port_number()))
            .attribute(AttributeSchema::new("port_range_max", types::port_number()))
            .attribute(AttributeSchema::new("remote_ip_prefix", types::ip_cidr()))
            .attribute(AttributeSchema::new("remote_group_id", AttributeType::String))
            .attribute(schemas::description())
            .attributes([
                schemas::computed_string("status"),
                schemas::computed_string("created_at"),
            ])
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (network, _) = network(request)?;
        Ok(Self { network })
    }
}

#[async_trait]
impl ResourceAdapter for SecurityGroupRuleResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let rule = found(self.network.get_rule(identifier).await)?;
        Ok(rule.as_ref().map(flatten_rule))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let security_group_id = required_str(config, "security_group_id")?;
        let rule = Rule {
            id: None,
            security_group_id: None,
            direction: optional_str(config, "direction"),
            ethertype: optional_str(config, "ethertype"),
            protocol: optional_str(config, "protocol"),
            port_range_min: optional_int(config, "port_range_min"),
            port_range_max: optional_int(config, "port_range_max"),
            remote_ip_prefix: optional_str(config, "remote_ip_prefix"),
            remote_group_id: optional_str(config, "remote_group_id"),
            description: optional_str(config, "description"),
            status: None,
            created_at: None,
        };
        let id = self
            .network
            .create_rule(&security_group_id, &rule)
            .await
            .map_err(sdk_error)?;
        debug!("created rule {} in security group {}", id, security_group_id);

        let rule = self.network.get_rule(&id).await.map_err(sdk_error)?;
        Ok((id, flatten_rule(&rule)))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, RULE_ARGUMENTS)?;
        let rule = self.network.get_rule(identifier).await.map_err(sdk_error)?;
        Ok(flatten_rule(&rule))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.network.delete_rule(identifier).await.map_err(sdk_error)
    }
}

// =============================================================================
// mgc_network_public_ips
// =============================================================================

pub struct PublicIpResource {
    network: NetworkClient,
    wait: WaitConfig,
}

impl Configure for PublicIpResource {
    const TYPE_NAME: &'static str = "mgc_network_public_ips";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Public IP allocated in a VPC")
            .attribute(schemas::id())
            .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
            .attribute(schemas::description())
            .attribute(
                AttributeSchema::new("port_id", AttributeType::String)
                    .with_description("Network interface the IP is attached to"),
            )
            .attributes([
                schemas::computed_string("public_ip"),
                schemas::computed_string("status"),
                schemas::computed_string("error"),
            ])
            .attributes(schemas::timestamps())
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (network, wait) = network(request)?;
        Ok(Self { network, wait })
    }
}

#[async_trait]
impl ResourceAdapter for PublicIpResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let ip = found(self.network.get_public_ip(identifier).await)?;
        Ok(ip.as_ref().map(flatten_public_ip))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let description = optional_str(config, "description");
        let id = self
            .network
            .create_public_ip(&required_str(config, "vpc_id")?, description.as_deref())
            .await
            .map_err(sdk_error)?;
        info!("allocated public ip {}", id);

        let mut ip = wait_for(
            &self.wait,
            &format!("public ip {}", id),
            || self.network.get_public_ip(&id),
            |ip| created(&ip.status, ip.error.as_deref()),
        )
        .await?;
        if let Some(port_id) = optional_str(config, "port_id") {
            self.network
                .attach_public_ip(&id, &port_id)
                .await
                .map_err(sdk_error)?;
            ip = self.network.get_public_ip(&id).await.map_err(sdk_error)?;
        }
        Ok((id, flatten_public_ip(&ip)))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        ensure_unchanged(from, to, &["vpc_id", "description"])?;

        let old_port = optional_str(from, "port_id");
        let new_port = optional_str(to, "port_id");
        if old_port != new_port {
            if let Some(port_id) = &old_port {
                self.network
                    .detach_public_ip(identifier, port_id)
                    .await
                    .map_err(sdk_error)?;
            }
            if let Some(port_id) = &new_port {
                self.network
                    .attach_public_ip(identifier, port_id)
                    .await
                    .map_err(sdk_error)?;
            }
        }

        let ip = self
            .network
            .get_public_ip(identifier)
            .await
            .map_err(sdk_error)?;
        Ok(flatten_public_ip(&ip))
    }

    async fn delete(&self, identifier: &str, state: &Attributes) -> ProviderResult<()> {
        if let Some(port_id) = optional_str(state, "port_id") {
            self.network
                .detach_public_ip(identifier, &port_id)
                .await
                .map_err(sdk_error)?;
        }
        self.network
            .delete_public_ip(identifier)
            .await
            .map_err(sdk_error)
    }
}
