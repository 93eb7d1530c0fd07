//! Kubernetes clusters and node pools
//!
//! Every optional SDK field maps to null when absent, status messages
//! included. Node pool status keeps all messages reported by the control
//! plane, in order.

use mgc_core::resource::{Attributes, Value};
use mgc_sdk::kubernetes::{Cluster, Flavor, NodePool, Status, Taint, Version};

use crate::tfutil::{attributes, int_ptr_to_i64_ptr, opt_time_to_rfc3339};

fn status_state(status: Option<&Status>) -> Value {
    status.map(|s| s.state.clone()).into()
}

fn status_messages(status: Option<&Status>) -> Value {
    status.and_then(|s| s.messages.clone()).into()
}

fn flatten_taint(taint: &Taint) -> Value {
    Value::Map(attributes([
        ("key", taint.key.clone().into()),
        ("value", taint.value.clone().into()),
        ("effect", taint.effect.clone().into()),
    ]))
}

pub fn flatten_cluster(cluster: &Cluster) -> Attributes {
    let controlplane = cluster.controlplane.as_ref();
    let network = cluster.network.as_ref();
    attributes([
        ("id", cluster.id.clone().into()),
        ("name", cluster.name.clone().into()),
        ("description", cluster.description.clone().into()),
        ("version", cluster.version.clone().into()),
        ("enabled_server_group", cluster.enabled_server_group.into()),
        ("enabled_bastion", cluster.enabled_bastion.into()),
        ("region", cluster.region.clone().into()),
        ("status", status_state(cluster.status.as_ref())),
        ("status_messages", status_messages(cluster.status.as_ref())),
        ("allowed_cidrs", cluster.allowed_cidrs.clone().into()),
        (
            "controlplane_public_address",
            controlplane.and_then(|c| c.public_address.clone()).into(),
        ),
        (
            "controlplane_addresses",
            controlplane.and_then(|c| c.addresses.clone()).into(),
        ),
        ("network_cidr", network.and_then(|n| n.cidr.clone()).into()),
        (
            "network_subnet_id",
            network.and_then(|n| n.subnet_id.clone()).into(),
        ),
        (
            "node_pools",
            Value::List(
                cluster
                    .node_pools
                    .iter()
                    .map(|np| Value::Map(flatten_nodepool(&cluster.id, np)))
                    .collect(),
            ),
        ),
        (
            "created_at",
            opt_time_to_rfc3339(cluster.created_at.as_ref()).into(),
        ),
        (
            "updated_at",
            opt_time_to_rfc3339(cluster.updated_at.as_ref()).into(),
        ),
    ])
}

pub fn flatten_nodepool(cluster_id: &str, pool: &NodePool) -> Attributes {
    let template = pool.instance_template.as_ref();
    let auto_scale = pool.auto_scale.as_ref();
    let labels = pool.labels.as_ref().map(|labels| {
        Value::Map(
            labels
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect(),
        )
    });
    let taints = pool
        .taints
        .as_ref()
        .map(|taints| Value::List(taints.iter().map(flatten_taint).collect()));

    attributes([
        ("id", pool.id.clone().into()),
        ("cluster_id", cluster_id.into()),
        ("name", pool.name.clone().into()),
        ("kubernetes_version", pool.kubernetes_version.clone().into()),
        ("flavor_name", template.map(|t| t.flavor.name.clone()).into()),
        ("flavor_id", template.and_then(|t| t.flavor.id.clone()).into()),
        ("node_image", template.and_then(|t| t.node_image.clone()).into()),
        ("disk_size", template.and_then(|t| t.disk_size).into()),
        ("disk_type", template.and_then(|t| t.disk_type.clone()).into()),
        ("replicas", pool.replicas.into()),
        ("min_replicas", auto_scale.and_then(|a| a.min_replicas).into()),
        ("max_replicas", auto_scale.and_then(|a| a.max_replicas).into()),
        (
            "max_pods_per_node",
            int_ptr_to_i64_ptr(pool.max_pods_per_node).into(),
        ),
        ("availability_zones", pool.availability_zones.clone().into()),
        ("labels", labels.unwrap_or(Value::Null)),
        ("tags", pool.tags.clone().into()),
        ("taints", taints.unwrap_or(Value::Null)),
        ("security_groups", pool.security_groups.clone().into()),
        ("status", status_state(pool.status.as_ref())),
        ("status_messages", status_messages(pool.status.as_ref())),
        (
            "created_at",
            opt_time_to_rfc3339(pool.created_at.as_ref()).into(),
        ),
        (
            "updated_at",
            opt_time_to_rfc3339(pool.updated_at.as_ref()).into(),
        ),
    ])
}

pub fn flatten_flavor(flavor: &Flavor) -> Value {
    Value::Map(attributes([
        ("id", flavor.id.clone().into()),
        ("name", flavor.name.clone().into()),
        ("vcpu", flavor.vcpu.into()),
        ("ram", flavor.ram.into()),
        ("size", flavor.size.into()),
        ("sku", flavor.sku.clone().into()),
    ]))
}

pub fn flatten_version(version: &Version) -> Value {
    Value::Map(attributes([
        ("version", version.version.clone().into()),
        ("deprecated", version.deprecated.into()),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nodepool(extra: serde_json::Value) -> NodePool {
        let mut pool = json!({
            "id": "np-1",
            "name": "workers",
            "replicas": 3,
            "instance_template": {
                "flavor": {"id": "f-1", "name": "cloud-k8s.gp1.small"},
                "disk_size": 20
            },
            "created_at": "2024-05-01T10:00:00Z"
        });
        if let (Some(pool), Some(extra)) = (pool.as_object_mut(), extra.as_object()) {
            pool.extend(extra.clone());
        }
        serde_json::from_value(pool).unwrap()
    }

    #[test]
    fn missing_max_pods_per_node_is_null() {
        let attrs = flatten_nodepool("c-1", &nodepool(json!({"max_pods_per_node": null})));
        assert_eq!(attrs["max_pods_per_node"], Value::Null);
        assert_eq!(attrs["replicas"], Value::from(3i64));
        assert_eq!(attrs["flavor_name"], Value::from("cloud-k8s.gp1.small"));
    }

    #[test]
    fn max_pods_per_node_is_kept() {
        let attrs = flatten_nodepool("c-1", &nodepool(json!({"max_pods_per_node": 110})));
        assert_eq!(attrs["max_pods_per_node"], Value::from(110i64));
    }

    #[test]
    fn every_status_message_is_kept() {
        let attrs = flatten_nodepool(
            "c-1",
            &nodepool(json!({
                "status": {
                    "state": "Failed",
                    "messages": ["quota exceeded", "retrying", "giving up"]
                }
            })),
        );
        assert_eq!(attrs["status"], Value::from("Failed"));
        assert_eq!(
            attrs["status_messages"],
            Value::from(vec!["quota exceeded", "retrying", "giving up"])
        );
    }

    #[test]
    fn missing_status_has_null_messages() {
        let attrs = flatten_nodepool("c-1", &nodepool(json!({})));
        assert_eq!(attrs["status"], Value::Null);
        assert_eq!(attrs["status_messages"], Value::Null);
        assert_eq!(attrs["labels"], Value::Null);
        assert_eq!(attrs["min_replicas"], Value::Null);
    }

    #[test]
    fn null_messages_stay_null() {
        let attrs = flatten_nodepool(
            "c-1",
            &nodepool(json!({"status": {"state": "Provisioning", "messages": null}})),
        );
        assert_eq!(attrs["status"], Value::from("Provisioning"));
        assert_eq!(attrs["status_messages"], Value::Null);

        let attrs = flatten_nodepool(
            "c-1",
            &nodepool(json!({"status": {"state": "Running", "messages": []}})),
        );
        assert_eq!(attrs["status_messages"], Value::List(vec![]));
    }

    #[test]
    fn taints_and_labels() {
        let attrs = flatten_nodepool(
            "c-1",
            &nodepool(json!({
                "labels": {"tier": "backend"},
                "taints": [{"key": "dedicated", "value": "gpu", "effect": "NoSchedule"}],
                "auto_scale": {"min_replicas": 1, "max_replicas": 5}
            })),
        );
        assert_eq!(attrs["labels"].as_map().unwrap()["tier"], Value::from("backend"));
        let Value::List(taints) = &attrs["taints"] else {
            panic!("expected list");
        };
        assert_eq!(taints[0].as_map().unwrap()["effect"], Value::from("NoSchedule"));
        assert_eq!(attrs["max_replicas"], Value::from(5i64));
    }

    #[test]
    fn cluster_nests_node_pools() {
        let cluster: Cluster = serde_json::from_value(json!({
            "id": "c-1",
            "name": "prod",
            "version": "v1.30.2",
            "status": {"state": "Running", "messages": []},
            "controlplane": {"public_address": "203.0.113.10"},
            "node_pools": [{"id": "np-1", "name": "workers", "replicas": 2}]
        }))
        .unwrap();

        let attrs = flatten_cluster(&cluster);
        assert_eq!(attrs["status"], Value::from("Running"));
        assert_eq!(attrs["controlplane_public_address"], Value::from("203.0.113.10"));
        let Value::List(pools) = &attrs["node_pools"] else {
            panic!("expected list");
        };
        assert_eq!(pools[0].as_map().unwrap()["cluster_id"], Value::from("c-1"));
    }
}
