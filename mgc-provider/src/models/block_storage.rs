use mgc_core::resource::{Attributes, Value};
use mgc_sdk::block_storage::{Volume, VolumeSnapshot, VolumeType};

use crate::tfutil::{attributes, opt_time_to_rfc3339, time_to_rfc3339};

pub fn flatten_volume(volume: &Volume) -> Attributes {
    let attachment = volume.attachment.as_ref();
    attributes([
        ("id", volume.id.clone().into()),
        ("name", volume.name.clone().into()),
        ("size", volume.size.into()),
        ("type", volume.volume_type.name.clone().into()),
        ("type_id", volume.volume_type.id.clone().into()),
        ("disk_type", volume.volume_type.disk_type.clone().into()),
        ("availability_zone", volume.availability_zone.clone().into()),
        ("encrypted", volume.encrypted.into()),
        ("status", volume.status.clone().into()),
        ("state", volume.state.clone().into()),
        (
            "instance_id",
            attachment.and_then(|a| a.instance.id.clone()).into(),
        ),
        ("device", attachment.and_then(|a| a.device.clone()).into()),
        ("created_at", time_to_rfc3339(&volume.created_at).into()),
        (
            "updated_at",
            opt_time_to_rfc3339(volume.updated_at.as_ref()).into(),
        ),
    ])
}

/// State of a volume attachment, keyed by volume
pub fn flatten_attachment(volume: &Volume) -> Option<Attributes> {
    let attachment = volume.attachment.as_ref()?;
    Some(attributes([
        ("block_storage_id", volume.id.clone().into()),
        ("virtual_machine_id", attachment.instance.id.clone().into()),
        ("device", attachment.device.clone().into()),
        (
            "attached_at",
            attachment
                .attached_at
                .as_ref()
                .map(time_to_rfc3339)
                .into(),
        ),
    ]))
}

pub fn flatten_volume_type(volume_type: &VolumeType) -> Value {
    let iops = volume_type.iops.as_ref();
    Value::Map(attributes([
        ("id", volume_type.id.clone().into()),
        ("name", volume_type.name.clone().into()),
        ("disk_type", volume_type.disk_type.clone().into()),
        ("status", volume_type.status.clone().into()),
        ("read_iops", iops.map(|i| i.read).into()),
        ("write_iops", iops.map(|i| i.write).into()),
        ("total_iops", iops.and_then(|i| i.total).into()),
        (
            "availability_zones",
            volume_type.availability_zones.clone().into(),
        ),
        ("allows_encryption", volume_type.allows_encryption.into()),
    ]))
}

pub fn flatten_volume_snapshot(snapshot: &VolumeSnapshot) -> Attributes {
    attributes([
        ("id", snapshot.id.clone().into()),
        ("name", snapshot.name.clone().into()),
        ("description", snapshot.description.clone().into()),
        (
            "volume_id",
            snapshot.volume.as_ref().and_then(|v| v.id.clone()).into(),
        ),
        ("size", snapshot.size.into()),
        ("type", snapshot.snapshot_type.clone().into()),
        ("status", snapshot.status.clone().into()),
        ("state", snapshot.state.clone().into()),
        ("created_at", time_to_rfc3339(&snapshot.created_at).into()),
        (
            "updated_at",
            opt_time_to_rfc3339(snapshot.updated_at.as_ref()).into(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn volume(attachment: serde_json::Value) -> Volume {
        serde_json::from_value(json!({
            "id": "vol-1",
            "name": "data",
            "size": 20,
            "status": "completed",
            "state": "in-use",
            "type": {"id": "t-1", "name": "cloud_nvme1k", "disk_type": "nvme"},
            "attachment": attachment,
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn attached_volume() {
        let volume = volume(json!({
            "instance": {"id": "i-1"},
            "device": "/dev/vdb",
            "attached_at": "2024-05-01T11:00:00Z"
        }));

        let attrs = flatten_volume(&volume);
        assert_eq!(attrs["instance_id"], Value::from("i-1"));
        assert_eq!(attrs["type"], Value::from("cloud_nvme1k"));

        let attachment = flatten_attachment(&volume).unwrap();
        assert_eq!(attachment["virtual_machine_id"], Value::from("i-1"));
        assert_eq!(attachment["attached_at"], Value::from("2024-05-01T11:00:00Z"));
    }

    #[test]
    fn detached_volume_has_no_attachment() {
        let volume = volume(serde_json::Value::Null);
        assert!(flatten_attachment(&volume).is_none());
        assert_eq!(flatten_volume(&volume)["instance_id"], Value::Null);
    }
}
