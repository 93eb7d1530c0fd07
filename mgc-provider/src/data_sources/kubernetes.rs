//! Kubernetes data sources

use async_trait::async_trait;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::ProviderResult;
use mgc_core::resource::{Attributes, Value};
use mgc_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use mgc_sdk::kubernetes::KubernetesClient;

use crate::adapter::{Configure, DataSourceAdapter};
use crate::context::ConfigureRequest;
use crate::data_sources::read_only;
use crate::models::kubernetes::{flatten_cluster, flatten_flavor, flatten_nodepool, flatten_version};
use crate::resources::kubernetes::{ClusterResource, NodePoolResource};
use crate::schemas;
use crate::tfutil::{attributes, optional_bool, required_str, sdk_error};

fn kubernetes(request: ConfigureRequest<'_>) -> Result<KubernetesClient, Diagnostic> {
    Ok(KubernetesClient::new(request.context()?.client.clone()))
}

fn flavor_list(name: &str) -> AttributeSchema {
    schemas::computed_list(
        name,
        schemas::computed_object([
            schemas::computed_string("id"),
            schemas::computed_string("name"),
            schemas::computed_int("vcpu"),
            schemas::computed_int("ram"),
            schemas::computed_int("size"),
            schemas::computed_string("sku"),
        ]),
    )
}

pub struct ClusterDataSource {
    kubernetes: KubernetesClient,
}

impl Configure for ClusterDataSource {
    const TYPE_NAME: &'static str = "mgc_kubernetes_cluster";

    fn schema() -> ResourceSchema {
        read_only(ClusterResource::schema(), Self::TYPE_NAME)
            .with_description("Look up a Kubernetes cluster by ID")
            .attribute(schemas::id_argument("cluster"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            kubernetes: kubernetes(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for ClusterDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let id = required_str(config, "id")?;
        let cluster = self.kubernetes.get_cluster(&id).await.map_err(sdk_error)?;
        Ok(flatten_cluster(&cluster))
    }
}

pub struct NodePoolDataSource {
    kubernetes: KubernetesClient,
}

impl Configure for NodePoolDataSource {
    const TYPE_NAME: &'static str = "mgc_kubernetes_nodepool";

    fn schema() -> ResourceSchema {
        read_only(NodePoolResource::schema(), Self::TYPE_NAME)
            .with_description("Look up a node pool of a cluster")
            .attribute(schemas::id_argument("node pool"))
            .attribute(AttributeSchema::new("cluster_id", AttributeType::String).required())
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            kubernetes: kubernetes(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for NodePoolDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let cluster_id = required_str(config, "cluster_id")?;
        let id = required_str(config, "id")?;
        let pool = self
            .kubernetes
            .get_nodepool(&cluster_id, &id)
            .await
            .map_err(sdk_error)?;
        Ok(flatten_nodepool(&cluster_id, &pool))
    }
}

pub struct VersionDataSource {
    kubernetes: KubernetesClient,
}

impl Configure for VersionDataSource {
    const TYPE_NAME: &'static str = "mgc_kubernetes_version";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Kubernetes versions offered for clusters")
            .attribute(
                AttributeSchema::new("include_deprecated", AttributeType::Bool)
                    .with_description("Also list deprecated versions"),
            )
            .attribute(schemas::computed_list(
                "versions",
                schemas::computed_object([
                    schemas::computed_string("version"),
                    schemas::computed_bool("deprecated"),
                ]),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            kubernetes: kubernetes(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for VersionDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let include_deprecated = optional_bool(config, "include_deprecated");
        let versions = self.kubernetes.list_versions().await.map_err(sdk_error)?;
        let versions = versions
            .iter()
            .filter(|v| include_deprecated.unwrap_or(false) || !v.deprecated)
            .map(flatten_version)
            .collect();
        Ok(attributes([
            ("include_deprecated", include_deprecated.into()),
            ("versions", Value::List(versions)),
        ]))
    }
}

pub struct FlavorDataSource {
    kubernetes: KubernetesClient,
}

impl Configure for FlavorDataSource {
    const TYPE_NAME: &'static str = "mgc_kubernetes_flavor";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Flavors available to bastions, control planes and node pools")
            .attribute(flavor_list("bastion"))
            .attribute(flavor_list("controlplane"))
            .attribute(flavor_list("nodepool"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            kubernetes: kubernetes(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for FlavorDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let catalog = self.kubernetes.list_flavors().await.map_err(sdk_error)?;
        let flavors = |list: &[mgc_sdk::kubernetes::Flavor]| {
            Value::List(list.iter().map(flatten_flavor).collect())
        };
        Ok(attributes([
            ("bastion", flavors(&catalog.bastion)),
            ("controlplane", flavors(&catalog.controlplane)),
            ("nodepool", flavors(&catalog.nodepool)),
        ]))
    }
}

pub struct KubeconfigDataSource {
    kubernetes: KubernetesClient,
}

impl Configure for KubeconfigDataSource {
    const TYPE_NAME: &'static str = "mgc_kubernetes_cluster_kubeconfig";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("Kubeconfig granting admin access to a cluster")
            .attribute(AttributeSchema::new("cluster_id", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("kubeconfig", AttributeType::String)
                    .computed()
                    .sensitive(),
            )
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            kubernetes: kubernetes(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for KubeconfigDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let cluster_id = required_str(config, "cluster_id")?;
        let kubeconfig = self
            .kubernetes
            .get_kubeconfig(&cluster_id)
            .await
            .map_err(sdk_error)?;
        Ok(attributes([
            ("cluster_id", cluster_id.into()),
            ("kubeconfig", kubeconfig.into()),
        ]))
    }
}
