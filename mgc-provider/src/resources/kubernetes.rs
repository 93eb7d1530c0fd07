//! Kubernetes clusters and node pools

use async_trait::async_trait;
use log::info;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::{ProviderError, ProviderResult};
use mgc_core::resource::Attributes;
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use mgc_sdk::kubernetes::{
    AutoScaleRequest, ClusterCreateRequest, KubernetesClient, NodePoolCreateRequest, Status,
    Taint,
};

use crate::adapter::{Configure, ResourceAdapter};
use crate::context::ConfigureRequest;
use crate::models::kubernetes::{flatten_cluster, flatten_nodepool};
use crate::schemas;
use crate::tfutil::{
    Poll, WaitConfig, carry_over, changed, ensure_unchanged, found, i64_ptr_to_int_ptr,
    object_list, optional_bool, optional_int, optional_str, required_int, required_str,
    sdk_error, string_list, wait_for,
};

/// Cluster arguments the API never echoes back
const CLUSTER_CONFIG_ONLY: &[&str] = &["cluster_ipv4_cidr", "services_ipv4_cidr"];

fn running(status: Option<&Status>) -> Poll {
    let Some(status) = status else {
        return Poll::Pending;
    };
    match status.state.to_ascii_lowercase().as_str() {
        "running" => Poll::Ready,
        "failed" | "error" => Poll::Failed(match status.messages.as_deref() {
            Some(messages) if !messages.is_empty() => messages.join("; "),
            _ => format!("state {}", status.state),
        }),
        _ => Poll::Pending,
    }
}

fn kubernetes(request: ConfigureRequest<'_>) -> Result<(KubernetesClient, WaitConfig), Diagnostic> {
    let context = request.context()?;
    Ok((KubernetesClient::new(context.client.clone()), context.wait))
}

fn to_i32(config: &Attributes, name: &str) -> ProviderResult<Option<i32>> {
    let value = optional_int(config, name);
    match (value, i64_ptr_to_int_ptr(value)) {
        (Some(v), None) => Err(ProviderError::new("Value out of range")
            .with_detail(format!("'{}' = {} does not fit a 32-bit integer", name, v))),
        (_, narrowed) => Ok(narrowed),
    }
}

// =============================================================================
// mgc_kubernetes_cluster
// =============================================================================

pub struct ClusterResource {
    kubernetes: KubernetesClient,
    wait: WaitConfig,
}

impl Configure for ClusterResource {
    const TYPE_NAME: &'static str = "mgc_kubernetes_cluster";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Managed Kubernetes cluster")
            .attribute(schemas::id())
            .attribute(schemas::name())
            .attribute(schemas::description())
            .attribute(
                AttributeSchema::new("version", AttributeType::String)
                    .required()
                    .with_description("Kubernetes version, e.g. v1.30.2"),
            )
            .attribute(
                AttributeSchema::new("enabled_server_group", AttributeType::Bool)
                    .optional_computed(),
            )
            .attribute(
                AttributeSchema::new(
                    "allowed_cidrs",
                    AttributeType::List(Box::new(types::cidr())),
                )
                .optional_computed()
                .with_description("Networks allowed to reach the API server"),
            )
            .attribute(AttributeSchema::new("cluster_ipv4_cidr", types::cidr()))
            .attribute(AttributeSchema::new("services_ipv4_cidr", types::cidr()))
            .attributes([
                schemas::computed_bool("enabled_bastion"),
                schemas::computed_string("region"),
                schemas::computed_string("status"),
                schemas::computed_list("status_messages", AttributeType::String),
                schemas::computed_string("controlplane_public_address"),
                schemas::computed_list("controlplane_addresses", AttributeType::String),
                schemas::computed_string("network_cidr"),
                schemas::computed_string("network_subnet_id"),
                schemas::computed_list(
                    "node_pools",
                    schemas::object_of(NodePoolResource::schema()),
                ),
            ])
            .attributes(schemas::timestamps())
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (kubernetes, wait) = kubernetes(request)?;
        Ok(Self { kubernetes, wait })
    }
}

impl ClusterResource {
    async fn wait_running(&self, id: &str) -> ProviderResult<Attributes> {
        let cluster = wait_for(
            &self.wait,
            &format!("cluster {}", id),
            || self.kubernetes.get_cluster(id),
            |c| running(c.status.as_ref()),
        )
        .await?;
        Ok(flatten_cluster(&cluster))
    }
}

#[async_trait]
impl ResourceAdapter for ClusterResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let cluster = found(self.kubernetes.get_cluster(identifier).await)?;
        Ok(cluster.as_ref().map(flatten_cluster))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let request = ClusterCreateRequest {
            name: required_str(config, "name")?,
            version: required_str(config, "version")?,
            description: optional_str(config, "description"),
            enabled_server_group: optional_bool(config, "enabled_server_group"),
            allowed_cidrs: string_list(config, "allowed_cidrs"),
            cluster_ipv4_cidr: optional_str(config, "cluster_ipv4_cidr"),
            services_ipv4_cidr: optional_str(config, "services_ipv4_cidr"),
            node_pools: Vec::new(),
        };
        let id = self
            .kubernetes
            .create_cluster(&request)
            .await
            .map_err(sdk_error)?;
        info!("created kubernetes cluster {}", id);

        let attrs = self.wait_running(&id).await?;
        Ok((id, carry_over(attrs, config, CLUSTER_CONFIG_ONLY)))
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
                "version",
                "enabled_server_group",
                "cluster_ipv4_cidr",
                "services_ipv4_cidr",
            ],
        )?;
        if changed(from, to, "allowed_cidrs") {
            let cidrs = string_list(to, "allowed_cidrs").unwrap_or_default();
            self.kubernetes
                .update_cluster_allowed_cidrs(identifier, &cidrs)
                .await
                .map_err(sdk_error)?;
        }
        let attrs = self.wait_running(identifier).await?;
        Ok(carry_over(attrs, to, CLUSTER_CONFIG_ONLY))
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        self.kubernetes
            .delete_cluster(identifier)
            .await
            .map_err(sdk_error)
    }
}

// =============================================================================
// mgc_kubernetes_nodepool
// =============================================================================

/// Node pools are addressed as `{cluster_id}/{nodepool_id}`
fn nodepool_identifier(identifier: &str) -> ProviderResult<(&str, &str)> {
    identifier
        .split_once('/')
        .filter(|(cluster, pool)| !cluster.is_empty() && !pool.is_empty())
        .ok_or_else(|| {
            ProviderError::new("Invalid node pool identifier").with_detail(format!(
                "expected '<cluster_id>/<nodepool_id>', got '{}'",
                identifier
            ))
        })
}

fn auto_scale(config: &Attributes) -> ProviderResult<Option<AutoScaleRequest>> {
    match (to_i32(config, "min_replicas")?, to_i32(config, "max_replicas")?) {
        (Some(min_replicas), Some(max_replicas)) => Ok(Some(AutoScaleRequest {
            min_replicas,
            max_replicas,
        })),
        (None, None) => Ok(None),
        _ => Err(ProviderError::new("Incomplete autoscaling").with_detail(
            "min_replicas and max_replicas must be set together",
        )),
    }
}

fn taints(config: &Attributes) -> ProviderResult<Option<Vec<Taint>>> {
    if config.get("taints").is_none_or(|v| v.is_null()) {
        return Ok(None);
    }
    object_list(config, "taints")
        .into_iter()
        .map(|taint| {
            Ok(Taint {
                key: required_str(taint, "key")?,
                value: required_str(taint, "value")?,
                effect: required_str(taint, "effect")?,
            })
        })
        .collect::<ProviderResult<Vec<_>>>()
        .map(Some)
}

pub struct NodePoolResource {
    kubernetes: KubernetesClient,
    wait: WaitConfig,
}

impl Configure for NodePoolResource {
    const TYPE_NAME: &'static str = "mgc_kubernetes_nodepool";

    fn schema() -> ResourceSchema {
        let taint = AttributeType::Object(vec![
            AttributeSchema::new("key", AttributeType::String).required(),
            AttributeSchema::new("value", AttributeType::String).required(),
            AttributeSchema::new(
                "effect",
                AttributeType::Enum(vec![
                    "NoSchedule".into(),
                    "PreferNoSchedule".into(),
                    "NoExecute".into(),
                ]),
            )
            .required(),
        ]);

        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Node pool of a Kubernetes cluster")
            .attribute(schemas::id())
            .attribute(AttributeSchema::new("cluster_id", AttributeType::String).required())
            .attribute(schemas::name())
            .attribute(
                AttributeSchema::new("flavor_name", AttributeType::String)
                    .required()
                    .with_description("Node flavor, e.g. cloud-k8s.gp1.small"),
            )
            .attribute(AttributeSchema::new("replicas", AttributeType::Int).required())
            .attribute(AttributeSchema::new("min_replicas", AttributeType::Int))
            .attribute(AttributeSchema::new("max_replicas", AttributeType::Int))
            .attribute(
                AttributeSchema::new("max_pods_per_node", types::positive_int())
                    .optional_computed(),
            )
            .attribute(
                AttributeSchema::new(
                    "availability_zones",
                    AttributeType::List(Box::new(schemas::availability_zone())),
                )
                .optional_computed(),
            )
            .attribute(AttributeSchema::new("tags", schemas::string_list()))
            .attribute(AttributeSchema::new(
                "taints",
                AttributeType::List(Box::new(taint)),
            ))
            .attributes([
                schemas::computed_string("kubernetes_version"),
                schemas::computed_string("flavor_id"),
                schemas::computed_string("node_image"),
                schemas::computed_int("disk_size"),
                schemas::computed_string("disk_type"),
                schemas::computed_list("security_groups", AttributeType::String),
                AttributeSchema::new("labels", AttributeType::Map(Box::new(AttributeType::String)))
                    .computed(),
                schemas::computed_string("status"),
                schemas::computed_list("status_messages", AttributeType::String),
            ])
            .attributes(schemas::timestamps())
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        let (kubernetes, wait) = kubernetes(request)?;
        Ok(Self { kubernetes, wait })
    }
}

impl NodePoolResource {
    async fn wait_running(&self, cluster_id: &str, id: &str) -> ProviderResult<Attributes> {
        let pool = wait_for(
            &self.wait,
            &format!("node pool {}", id),
            || self.kubernetes.get_nodepool(cluster_id, id),
            |p| running(p.status.as_ref()),
        )
        .await?;
        Ok(flatten_nodepool(cluster_id, &pool))
    }
}

#[async_trait]
impl ResourceAdapter for NodePoolResource {
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>> {
        let (cluster_id, id) = nodepool_identifier(identifier)?;
        let pool = found(self.kubernetes.get_nodepool(cluster_id, id).await)?;
        Ok(pool.map(|p| flatten_nodepool(cluster_id, &p)))
    }

    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)> {
        let cluster_id = required_str(config, "cluster_id")?;
        let replicas = required_int(config, "replicas")?;
        let request = NodePoolCreateRequest {
            name: required_str(config, "name")?,
            flavor: required_str(config, "flavor_name")?,
            replicas: i64_ptr_to_int_ptr(Some(replicas)).ok_or_else(|| {
                ProviderError::new("Value out of range")
                    .with_detail(format!("'replicas' = {} does not fit a 32-bit integer", replicas))
            })?,
            auto_scale: auto_scale(config)?,
            max_pods_per_node: to_i32(config, "max_pods_per_node")?,
            availability_zones: string_list(config, "availability_zones"),
            tags: string_list(config, "tags"),
            taints: taints(config)?,
        };
        let pool = self
            .kubernetes
            .create_nodepool(&cluster_id, &request)
            .await
            .map_err(sdk_error)?;
        info!("created node pool {} in cluster {}", pool.id, cluster_id);

        let attrs = self.wait_running(&cluster_id, &pool.id).await?;
        Ok((format!("{}/{}", cluster_id, pool.id), attrs))
    }

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes> {
        let (cluster_id, id) = nodepool_identifier(identifier)?;
        ensure_unchanged(
            from,
            to,
            &[
                "cluster_id",
                "name",
                "flavor_name",
                "max_pods_per_node",
                "availability_zones",
                "tags",
                "taints",
            ],
        )?;

        if ["replicas", "min_replicas", "max_replicas"]
            .iter()
            .any(|name| changed(from, to, name))
        {
            let replicas = to_i32(to, "replicas")?.unwrap_or_default();
            let auto_scale = auto_scale(to)?;
            self.kubernetes
                .patch_nodepool(cluster_id, id, replicas, auto_scale.as_ref())
                .await
                .map_err(sdk_error)?;
        }
        self.wait_running(cluster_id, id).await
    }

    async fn delete(&self, identifier: &str, _state: &Attributes) -> ProviderResult<()> {
        let (cluster_id, id) = nodepool_identifier(identifier)?;
        self.kubernetes
            .delete_nodepool(cluster_id, id)
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

    #[test]
    fn identifiers() {
        assert_eq!(nodepool_identifier("c-1/np-1").unwrap(), ("c-1", "np-1"));
        assert!(nodepool_identifier("np-1").is_err());
        assert!(nodepool_identifier("c-1/").is_err());
    }

    #[test]
    fn autoscaling_needs_both_bounds() {
        let config = attributes([("min_replicas", Value::from(1i64))]);
        assert_eq!(
            auto_scale(&config).unwrap_err().message,
            "Incomplete autoscaling"
        );
        assert_eq!(auto_scale(&Attributes::new()).unwrap(), None);
    }

    #[test]
    fn failed_state_reports_all_messages() {
        let status = Status {
            state: "Failed".into(),
            messages: Some(vec!["no capacity".into(), "rolled back".into()]),
        };
        assert_eq!(
            running(Some(&status)),
            Poll::Failed("no capacity; rolled back".into())
        );
        let silent = Status {
            state: "Error".into(),
            messages: None,
        };
        assert_eq!(running(Some(&silent)), Poll::Failed("state Error".into()));
        assert_eq!(running(None), Poll::Pending);
    }

    #[tokio::test]
    async fn scaling_patches_the_pool() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/kubernetes/v0/clusters/c-1/node_pools/np-1"))
            .and(body_json(json!({"replicas": 5})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/kubernetes/v0/clusters/c-1/node_pools/np-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "np-1",
                "name": "workers",
                "replicas": 5,
                "status": {"state": "Running", "messages": []}
            })))
            .mount(&server)
            .await;

        let data: ProviderData = context_for(&server.uri());
        let resource = NodePoolResource::configure(ConfigureRequest::resource(&data)).unwrap();
        let attrs = resource
            .update(
                "c-1/np-1",
                &attributes([("replicas", Value::from(3i64))]),
                &attributes([("replicas", Value::from(5i64))]),
            )
            .await
            .unwrap();
        assert_eq!(attrs["replicas"], Value::from(5i64));
        assert_eq!(attrs["max_pods_per_node"], Value::Null);
    }
}
