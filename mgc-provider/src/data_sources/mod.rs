//! Data sources

pub mod block_storage;
pub mod compute;
pub mod container_registry;
pub mod dbaas;
pub mod kubernetes;
pub mod network;
pub mod object_storage;

use mgc_core::schema::{AttributeSchema, ResourceSchema};

use crate::adapter::DataSourceEntry;

/// Derive a data source schema from a resource schema
///
/// Every attribute becomes computed; sensitivity and descriptions are kept,
/// defaults are dropped.
pub(crate) fn read_only(schema: ResourceSchema, type_name: &str) -> ResourceSchema {
    let mut derived = ResourceSchema::new(type_name);
    derived.description = schema.description;
    for attr in schema.attributes.into_values() {
        let mut computed = AttributeSchema::new(attr.name, attr.attr_type).computed();
        computed.sensitive = attr.sensitive;
        computed.description = attr.description;
        derived = derived.attribute(computed);
    }
    derived
}

/// Every data source type, in registration order
pub fn data_source_entries() -> Vec<DataSourceEntry> {
    vec![
        // Compute
        DataSourceEntry::of::<compute::InstanceDataSource>(),
        DataSourceEntry::of::<compute::InstancesDataSource>(),
        DataSourceEntry::of::<compute::MachineTypesDataSource>(),
        DataSourceEntry::of::<compute::ImagesDataSource>(),
        DataSourceEntry::of::<compute::SshKeysDataSource>(),
        // Block storage
        DataSourceEntry::of::<block_storage::VolumeDataSource>(),
        DataSourceEntry::of::<block_storage::VolumesDataSource>(),
        DataSourceEntry::of::<block_storage::VolumeTypesDataSource>(),
        // Network
        DataSourceEntry::of::<network::VpcDataSource>(),
        DataSourceEntry::of::<network::VpcsDataSource>(),
        DataSourceEntry::of::<network::SubnetDataSource>(),
        DataSourceEntry::of::<network::SecurityGroupDataSource>(),
        DataSourceEntry::of::<network::PublicIpDataSource>(),
        // Kubernetes
        DataSourceEntry::of::<kubernetes::ClusterDataSource>(),
        DataSourceEntry::of::<kubernetes::NodePoolDataSource>(),
        DataSourceEntry::of::<kubernetes::VersionDataSource>(),
        DataSourceEntry::of::<kubernetes::FlavorDataSource>(),
        DataSourceEntry::of::<kubernetes::KubeconfigDataSource>(),
        // DBaaS
        DataSourceEntry::of::<dbaas::DatabaseInstanceDataSource>(),
        DataSourceEntry::of::<dbaas::DatabaseInstancesDataSource>(),
        DataSourceEntry::of::<dbaas::DatabaseClustersDataSource>(),
        DataSourceEntry::of::<dbaas::EnginesDataSource>(),
        DataSourceEntry::of::<dbaas::InstanceTypesDataSource>(),
        // Container registry
        DataSourceEntry::of::<container_registry::RegistriesDataSource>(),
        DataSourceEntry::of::<container_registry::CredentialsDataSource>(),
        DataSourceEntry::of::<container_registry::RepositoriesDataSource>(),
        // Object storage
        DataSourceEntry::of::<object_storage::BucketsDataSource>(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgc_core::provider::ResourceType;
    use mgc_core::resource::Value;
    use mgc_core::schema::AttributeType;
    use std::collections::HashSet;

    #[test]
    fn type_names_are_unique() {
        let entries = data_source_entries();
        let names: HashSet<_> = entries.iter().map(|e| e.type_name).collect();
        assert_eq!(names.len(), entries.len());
        assert_eq!(entries.len(), 27);
    }

    #[test]
    fn schemas_carry_their_type_name() {
        for entry in data_source_entries() {
            assert_eq!(entry.schema().resource_type, entry.type_name);
        }
    }

    #[test]
    fn read_only_marks_everything_computed() {
        let schema = ResourceSchema::new("mgc_things")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("size", AttributeType::Int).with_default(Value::Int(10)),
            )
            .attribute(
                AttributeSchema::new("token", AttributeType::String)
                    .sensitive()
                    .with_description("Access token"),
            );

        let derived = read_only(schema, "mgc_thing");
        assert_eq!(derived.resource_type, "mgc_thing");
        assert!(derived.attributes.values().all(|a| a.is_read_only()));
        assert!(derived.attributes["size"].default.is_none());
        assert!(derived.attributes["token"].sensitive);
        assert_eq!(
            derived.attributes["token"].description.as_deref(),
            Some("Access token")
        );
    }
}
