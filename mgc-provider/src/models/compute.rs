use mgc_core::resource::{Attributes, Value};
use mgc_sdk::compute::{Image, Instance, MachineType, Snapshot, SshKey};

use crate::tfutil::{attributes, opt_time_to_rfc3339, time_to_rfc3339};

pub fn flatten_instance(instance: &Instance) -> Attributes {
    let primary = instance.primary_interface();
    let ips = primary.and_then(|i| i.ip_addresses.as_ref());
    let vpc_id = instance
        .network
        .as_ref()
        .and_then(|n| n.vpc.as_ref())
        .and_then(|vpc| vpc.id.clone());

    attributes([
        ("id", instance.id.clone().into()),
        ("name", instance.name.clone().into()),
        ("machine_type", instance.machine_type.name.clone().into()),
        ("machine_type_id", instance.machine_type.id.clone().into()),
        ("image", instance.image.name.clone().into()),
        ("image_id", instance.image.id.clone().into()),
        ("ssh_key_name", instance.ssh_key_name.clone().into()),
        ("availability_zone", instance.availability_zone.clone().into()),
        ("vpc_id", vpc_id.into()),
        (
            "network_interface_id",
            primary.map(|i| i.id.clone()).into(),
        ),
        (
            "private_ipv4",
            ips.and_then(|ip| ip.private_ipv4.clone()).into(),
        ),
        (
            "public_ipv4",
            ips.and_then(|ip| ip.public_ipv4.clone()).into(),
        ),
        ("ipv6", ips.and_then(|ip| ip.ipv6.clone()).into()),
        ("user_data", instance.user_data.clone().into()),
        ("labels", instance.labels.clone().into()),
        ("status", instance.status.clone().into()),
        ("state", instance.state.clone().into()),
        (
            "error",
            instance.error.as_ref().map(|e| e.message.clone()).into(),
        ),
        ("created_at", time_to_rfc3339(&instance.created_at).into()),
        (
            "updated_at",
            opt_time_to_rfc3339(instance.updated_at.as_ref()).into(),
        ),
    ])
}

pub fn flatten_machine_type(machine_type: &MachineType) -> Value {
    Value::Map(attributes([
        ("id", machine_type.id.clone().into()),
        ("name", machine_type.name.clone().into()),
        ("vcpus", machine_type.vcpus.into()),
        ("ram", machine_type.ram.into()),
        ("disk", machine_type.disk.into()),
        ("gpu", machine_type.gpu.into()),
        ("status", machine_type.status.clone().into()),
        (
            "availability_zones",
            machine_type.availability_zones.clone().into(),
        ),
    ]))
}

pub fn flatten_image(image: &Image) -> Value {
    let requirements = image.minimum_requirements.as_ref();
    Value::Map(attributes([
        ("id", image.id.clone().into()),
        ("name", image.name.clone().into()),
        ("status", image.status.clone().into()),
        ("version", image.version.clone().into()),
        ("platform", image.platform.clone().into()),
        ("release_at", image.release_at.clone().into()),
        (
            "end_standard_support_at",
            image.end_standard_support_at.clone().into(),
        ),
        ("minimum_vcpu", requirements.map(|r| r.vcpu).into()),
        ("minimum_ram", requirements.map(|r| r.ram).into()),
        ("minimum_disk", requirements.map(|r| r.disk).into()),
        ("availability_zones", image.availability_zones.clone().into()),
    ]))
}

pub fn flatten_snapshot(snapshot: &Snapshot) -> Attributes {
    attributes([
        ("id", snapshot.id.clone().into()),
        ("name", snapshot.name.clone().into()),
        (
            "instance_id",
            snapshot.instance.as_ref().and_then(|i| i.id.clone()).into(),
        ),
        ("size", snapshot.size.into()),
        ("status", snapshot.status.clone().into()),
        ("state", snapshot.state.clone().into()),
        ("created_at", time_to_rfc3339(&snapshot.created_at).into()),
        (
            "updated_at",
            opt_time_to_rfc3339(snapshot.updated_at.as_ref()).into(),
        ),
    ])
}

pub fn flatten_ssh_key(key: &SshKey) -> Attributes {
    attributes([
        ("id", key.id.clone().into()),
        ("name", key.name.clone().into()),
        ("key", key.key.clone().into()),
        ("key_type", key.key_type.clone().into()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn instance_without_network_has_null_addresses() {
        let instance: Instance = serde_json::from_value(json!({
            "id": "i-1",
            "machine_type": {"id": "mt-1"},
            "image": {"name": "ubuntu"},
            "status": "creating",
            "state": "pending",
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        let attrs = flatten_instance(&instance);
        assert_eq!(attrs["machine_type_id"], Value::from("mt-1"));
        assert_eq!(attrs["machine_type"], Value::Null);
        assert_eq!(attrs["name"], Value::Null);
        assert_eq!(attrs["private_ipv4"], Value::Null);
        assert_eq!(attrs["vpc_id"], Value::Null);
        assert_eq!(attrs["labels"], Value::List(vec![]));
        assert_eq!(attrs["created_at"], Value::from("2024-05-01T10:00:00Z"));
        assert_eq!(attrs["updated_at"], Value::Null);
    }

    #[test]
    fn image_without_requirements() {
        let image: Image = serde_json::from_value(json!({
            "id": "img-1",
            "name": "ubuntu-22.04",
            "status": "active"
        }))
        .unwrap();
        let Value::Map(attrs) = flatten_image(&image) else {
            panic!("expected map");
        };
        assert_eq!(attrs["minimum_vcpu"], Value::Null);
        assert_eq!(attrs["version"], Value::Null);
    }
}
