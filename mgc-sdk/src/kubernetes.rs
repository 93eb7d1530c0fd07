//! Kubernetes API client: clusters, node pools, versions and flavors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::common::Results;
use crate::error::{Result, SdkError};

const BASE: &str = "kubernetes/v0";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub enabled_server_group: Option<bool>,
    pub enabled_bastion: Option<bool>,
    pub region: Option<String>,
    pub status: Option<Status>,
    #[serde(default)]
    pub allowed_cidrs: Vec<String>,
    pub controlplane: Option<Controlplane>,
    pub network: Option<ClusterNetwork>,
    #[serde(default)]
    pub node_pools: Vec<NodePool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Controlplane {
    pub addresses: Option<Vec<String>>,
    pub public_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClusterNetwork {
    pub uuid: Option<String>,
    pub cidr: Option<String>,
    pub name: Option<String>,
    pub subnet_id: Option<String>,
}

/// Lifecycle state with every message reported by the control plane.
/// The API sends `messages` as null or omits it while there is nothing to say.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Status {
    pub state: String,
    #[serde(default)]
    pub messages: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodePool {
    pub id: String,
    pub name: String,
    pub kubernetes_version: Option<String>,
    pub instance_template: Option<InstanceTemplate>,
    pub replicas: i32,
    pub auto_scale: Option<AutoScale>,
    pub max_pods_per_node: Option<i32>,
    pub availability_zones: Option<Vec<String>>,
    pub labels: Option<std::collections::BTreeMap<String, String>>,
    pub tags: Option<Vec<String>>,
    pub taints: Option<Vec<Taint>>,
    pub security_groups: Option<Vec<String>>,
    pub status: Option<Status>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstanceTemplate {
    pub flavor: Flavor,
    pub node_image: Option<String>,
    pub disk_size: Option<i32>,
    pub disk_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AutoScale {
    pub min_replicas: Option<i32>,
    pub max_replicas: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taint {
    pub key: String,
    pub value: String,
    pub effect: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Flavor {
    pub id: Option<String>,
    pub name: String,
    pub vcpu: Option<i32>,
    pub ram: Option<i32>,
    pub size: Option<i32>,
    pub sku: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Version {
    pub version: String,
    pub deprecated: bool,
}

/// Flavors grouped by the role they can be used for
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlavorCatalog {
    #[serde(default)]
    pub bastion: Vec<Flavor>,
    #[serde(default)]
    pub controlplane: Vec<Flavor>,
    #[serde(default)]
    pub nodepool: Vec<Flavor>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NodePoolCreateRequest {
    pub name: String,
    pub flavor: String,
    pub replicas: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_scale: Option<AutoScaleRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pods_per_node: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taints: Option<Vec<Taint>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutoScaleRequest {
    pub min_replicas: i32,
    pub max_replicas: i32,
}

impl NodePoolCreateRequest {
    fn validate(&self) -> Result<()> {
        if self.replicas < 0 {
            return Err(SdkError::validation("replicas", "must not be negative"));
        }
        if let Some(auto_scale) = &self.auto_scale
            && auto_scale.min_replicas > auto_scale.max_replicas
        {
            return Err(SdkError::validation(
                "auto_scale.min_replicas",
                "must not exceed max_replicas",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterCreateRequest {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_server_group: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_cidrs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_ipv4_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services_ipv4_cidr: Option<String>,
    /// Node pools created alongside the cluster
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub node_pools: Vec<NodePoolCreateRequest>,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
struct FlavorEnvelope {
    #[serde(default)]
    results: Vec<FlavorCatalog>,
}

/// Kubernetes API client
#[derive(Debug, Clone)]
pub struct KubernetesClient {
    client: Client,
}

impl KubernetesClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    // =========================================================================
    // Clusters
    // =========================================================================

    pub async fn create_cluster(&self, request: &ClusterCreateRequest) -> Result<String> {
        if request.name.trim().is_empty() {
            return Err(SdkError::validation("name", "must not be empty"));
        }
        for pool in &request.node_pools {
            pool.validate()?;
        }
        let created: Created = self
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

    pub async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        let list: Results<Cluster> = self
            .client
            .get(&format!("{}/clusters", BASE), &[])
            .await?;
        Ok(list.results)
    }

    pub async fn update_cluster_allowed_cidrs(&self, id: &str, cidrs: &[String]) -> Result<()> {
        self.client
            .patch(
                &format!("{}/clusters/{}", BASE, id),
                &serde_json::json!({ "allowed_cidrs": cidrs }),
            )
            .await
    }

    pub async fn delete_cluster(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("{}/clusters/{}", BASE, id), &[])
            .await
    }

    /// Kubeconfig document for a cluster, as YAML text
    pub async fn get_kubeconfig(&self, cluster_id: &str) -> Result<String> {
        self.client
            .get_text(&format!("{}/clusters/{}/kubeconfig", BASE, cluster_id))
            .await
    }

    // =========================================================================
    // Node pools
    // =========================================================================

    pub async fn create_nodepool(
        &self,
        cluster_id: &str,
        request: &NodePoolCreateRequest,
    ) -> Result<NodePool> {
        request.validate()?;
        self.client
            .post(&format!("{}/clusters/{}/node_pools", BASE, cluster_id), request)
            .await
    }

    pub async fn get_nodepool(&self, cluster_id: &str, id: &str) -> Result<NodePool> {
        self.client
            .get(
                &format!("{}/clusters/{}/node_pools/{}", BASE, cluster_id, id),
                &[],
            )
            .await
    }

    pub async fn list_nodepools(&self, cluster_id: &str) -> Result<Vec<NodePool>> {
        let list: Results<NodePool> = self
            .client
            .get(&format!("{}/clusters/{}/node_pools", BASE, cluster_id), &[])
            .await?;
        Ok(list.results)
    }

    /// Resize a node pool, optionally replacing its autoscaling bounds
    pub async fn patch_nodepool(
        &self,
        cluster_id: &str,
        id: &str,
        replicas: i32,
        auto_scale: Option<&AutoScaleRequest>,
    ) -> Result<()> {
        let mut body = serde_json::json!({ "replicas": replicas });
        if let Some(auto_scale) = auto_scale {
            if auto_scale.min_replicas > auto_scale.max_replicas {
                return Err(SdkError::validation(
                    "auto_scale.min_replicas",
                    "must not exceed max_replicas",
                ));
            }
            body["auto_scale"] = serde_json::json!(auto_scale);
        }
        self.client
            .patch(
                &format!("{}/clusters/{}/node_pools/{}", BASE, cluster_id, id),
                &body,
            )
            .await
    }

    pub async fn delete_nodepool(&self, cluster_id: &str, id: &str) -> Result<()> {
        self.client
            .delete(
                &format!("{}/clusters/{}/node_pools/{}", BASE, cluster_id, id),
                &[],
            )
            .await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn list_versions(&self) -> Result<Vec<Version>> {
        let list: Results<Version> = self
            .client
            .get(&format!("{}/versions", BASE), &[])
            .await?;
        Ok(list.results)
    }

    pub async fn list_flavors(&self) -> Result<FlavorCatalog> {
        let envelope: FlavorEnvelope = self
            .client
            .get(&format!("{}/flavors", BASE), &[])
            .await?;
        Ok(envelope.results.into_iter().next().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn kubernetes(server: &MockServer) -> KubernetesClient {
        let config =
            ClientConfig::new(server.uri(), "k").with_retries(0, Duration::from_millis(1));
        KubernetesClient::new(Client::new(config).unwrap())
    }

    #[test]
    fn nodepool_decodes_without_optional_fields() {
        let pool: NodePool = serde_json::from_value(json!({
            "id": "np-1",
            "name": "default",
            "replicas": 3,
            "status": {"state": "Running", "messages": ["a", "b", "c"]}
        }))
        .unwrap();
        assert!(pool.max_pods_per_node.is_none());
        assert!(pool.taints.is_none());
        assert_eq!(pool.status.unwrap().messages.map(|m| m.len()), Some(3));
    }

    #[test]
    fn status_tolerates_null_messages() {
        let cluster: Cluster = serde_json::from_value(json!({
            "id": "c-1",
            "name": "prod",
            "version": "v1.30.2",
            "status": {"state": "Provisioning", "messages": null},
            "node_pools": [{
                "id": "np-1",
                "name": "workers",
                "replicas": 2,
                "status": {"state": "Provisioning"}
            }]
        }))
        .unwrap();
        let status = cluster.status.unwrap();
        assert_eq!(status.state, "Provisioning");
        assert_eq!(status.messages, None);
        assert_eq!(cluster.node_pools[0].status.as_ref().unwrap().messages, None);
    }

    #[test]
    fn nodepool_autoscale_bounds_checked() {
        let request = NodePoolCreateRequest {
            name: "np".into(),
            flavor: "cloud-k8s.gp1.small".into(),
            replicas: 1,
            auto_scale: Some(AutoScaleRequest {
                min_replicas: 5,
                max_replicas: 2,
            }),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }

    #[tokio::test]
    async fn kubeconfig_is_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kubernetes/v0/clusters/c-1/kubeconfig"))
            .respond_with(ResponseTemplate::new(200).set_body_string("apiVersion: v1\n"))
            .mount(&server)
            .await;

        let kubeconfig = kubernetes(&server).get_kubeconfig("c-1").await.unwrap();
        assert_eq!(kubeconfig, "apiVersion: v1\n");
    }

    #[tokio::test]
    async fn flavors_unwrap_first_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kubernetes/v0/flavors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "bastion": [],
                    "controlplane": [{"name": "cp.small"}],
                    "nodepool": [{"name": "np.small", "vcpu": 2, "ram": 4096, "size": 40}]
                }]
            })))
            .mount(&server)
            .await;

        let catalog = kubernetes(&server).list_flavors().await.unwrap();
        assert_eq!(catalog.nodepool[0].vcpu, Some(2));
        assert_eq!(catalog.controlplane.len(), 1);
    }
}
