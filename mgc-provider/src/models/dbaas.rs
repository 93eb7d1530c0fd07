use mgc_core::resource::{Attributes, Value};
use mgc_sdk::dbaas::{Address, Cluster, Engine, Instance, InstanceType};

use crate::tfutil::{attributes, opt_time_to_rfc3339, time_to_rfc3339};

fn flatten_addresses(addresses: &[Address]) -> Value {
    Value::List(
        addresses
            .iter()
            .map(|a| {
                Value::Map(attributes([
                    ("access", a.access.clone().into()),
                    ("type", a.address_type.clone().into()),
                    ("address", a.address.clone().into()),
                    ("port", a.port.clone().into()),
                ]))
            })
            .collect(),
    )
}

pub fn flatten_instance(instance: &Instance) -> Attributes {
    attributes([
        ("id", instance.id.clone().into()),
        ("name", instance.name.clone().into()),
        ("engine_id", instance.engine_id.clone().into()),
        ("instance_type_id", instance.instance_type_id.clone().into()),
        ("status", instance.status.clone().into()),
        ("volume_size", instance.volume.size.into()),
        ("volume_type", instance.volume.volume_type.clone().into()),
        ("backup_retention_days", instance.backup_retention_days.into()),
        ("backup_start_at", instance.backup_start_at.clone().into()),
        ("availability_zone", instance.availability_zone.clone().into()),
        ("parameter_group_id", instance.parameter_group_id.clone().into()),
        ("addresses", flatten_addresses(&instance.addresses)),
        ("created_at", time_to_rfc3339(&instance.created_at).into()),
        (
            "updated_at",
            opt_time_to_rfc3339(instance.updated_at.as_ref()).into(),
        ),
        (
            "finished_at",
            opt_time_to_rfc3339(instance.finished_at.as_ref()).into(),
        ),
    ])
}

pub fn flatten_cluster(cluster: &Cluster) -> Attributes {
    attributes([
        ("id", cluster.id.clone().into()),
        ("name", cluster.name.clone().into()),
        ("engine_id", cluster.engine_id.clone().into()),
        ("instance_type_id", cluster.instance_type_id.clone().into()),
        ("status", cluster.status.clone().into()),
        ("volume_size", cluster.volume.size.into()),
        ("volume_type", cluster.volume.volume_type.clone().into()),
        ("backup_retention_days", cluster.backup_retention_days.into()),
        ("backup_start_at", cluster.backup_start_at.clone().into()),
        ("parameter_group_id", cluster.parameter_group_id.clone().into()),
        ("addresses", flatten_addresses(&cluster.addresses)),
        ("created_at", time_to_rfc3339(&cluster.created_at).into()),
        (
            "updated_at",
            opt_time_to_rfc3339(cluster.updated_at.as_ref()).into(),
        ),
        (
            "finished_at",
            opt_time_to_rfc3339(cluster.finished_at.as_ref()).into(),
        ),
    ])
}

pub fn flatten_engine(engine: &Engine) -> Value {
    Value::Map(attributes([
        ("id", engine.id.clone().into()),
        ("name", engine.name.clone().into()),
        ("version", engine.version.clone().into()),
        ("status", engine.status.clone().into()),
    ]))
}

pub fn flatten_instance_type(instance_type: &InstanceType) -> Value {
    Value::Map(attributes([
        ("id", instance_type.id.clone().into()),
        ("name", instance_type.name.clone().into()),
        ("label", instance_type.label.clone().into()),
        ("family_slug", instance_type.family_slug.clone().into()),
        (
            "family_description",
            instance_type.family_description.clone().into(),
        ),
        ("vcpu", instance_type.vcpu.clone().into()),
        ("ram", instance_type.ram.clone().into()),
        ("size", instance_type.size.clone().into()),
        (
            "compatible_product",
            instance_type.compatible_product.clone().into(),
        ),
        ("status", instance_type.status.clone().into()),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn instance_addresses() {
        let instance: Instance = serde_json::from_value(json!({
            "id": "db-1",
            "name": "orders",
            "engine_id": "e-1",
            "instance_type_id": "it-1",
            "status": "ACTIVE",
            "volume": {"size": 20, "type": "CLOUD_NVME15K"},
            "backup_retention_days": 7,
            "addresses": [
                {"access": "PRIVATE", "type": "IPv4", "address": "10.0.0.5", "port": "5432"},
                {"access": "PUBLIC"}
            ],
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        let attrs = flatten_instance(&instance);
        assert_eq!(attrs["volume_size"], Value::from(20i64));
        assert_eq!(attrs["backup_retention_days"], Value::from(7i64));
        let Value::List(addresses) = &attrs["addresses"] else {
            panic!("expected list");
        };
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[1].as_map().unwrap()["address"], Value::Null);
        assert_eq!(attrs["finished_at"], Value::Null);
    }
}
