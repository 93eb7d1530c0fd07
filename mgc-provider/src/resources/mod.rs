//! Managed resources

pub mod block_storage;
pub mod compute;
pub mod container_registry;
pub mod dbaas;
pub mod kubernetes;
pub mod network;
pub mod object_storage;

use crate::adapter::ResourceEntry;

/// Every managed resource type, in registration order
pub fn resource_entries() -> Vec<ResourceEntry> {
    vec![
        // Compute
        ResourceEntry::of::<compute::InstanceResource>(),
        ResourceEntry::of::<compute::SshKeyResource>(),
        ResourceEntry::of::<compute::InstanceSnapshotResource>(),
        // Block storage
        ResourceEntry::of::<block_storage::VolumeResource>(),
        ResourceEntry::of::<block_storage::VolumeAttachmentResource>(),
        ResourceEntry::of::<block_storage::VolumeSnapshotResource>(),
        // Network
        ResourceEntry::of::<network::VpcResource>(),
        ResourceEntry::of::<network::SubnetResource>(),
        ResourceEntry::of::<network::SecurityGroupResource>(),
        ResourceEntry::of::<network::SecurityGroupRuleResource>(),
        ResourceEntry::of::<network::PublicIpResource>(),
        // Kubernetes
        ResourceEntry::of::<kubernetes::ClusterResource>(),
        ResourceEntry::of::<kubernetes::NodePoolResource>(),
        // DBaaS
        ResourceEntry::of::<dbaas::DatabaseInstanceResource>(),
        ResourceEntry::of::<dbaas::DatabaseClusterResource>(),
        // Registry and object storage
        ResourceEntry::of::<container_registry::ContainerRegistryResource>(),
        ResourceEntry::of::<object_storage::BucketResource>(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgc_core::provider::ResourceType;
    use std::collections::HashSet;

    #[test]
    fn type_names_are_unique() {
        let entries = resource_entries();
        let names: HashSet<_> = entries.iter().map(|e| e.type_name).collect();
        assert_eq!(names.len(), entries.len());
        assert_eq!(entries.len(), 17);
    }

    #[test]
    fn schemas_carry_their_type_name() {
        for entry in resource_entries() {
            let schema = entry.schema();
            assert_eq!(schema.resource_type, entry.type_name);
            assert!(
                schema.attributes.values().any(|a| a.required),
                "{} has no required argument",
                entry.type_name
            );
        }
    }
}
