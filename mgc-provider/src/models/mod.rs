//! Flattening of SDK responses into attribute maps
//!
//! One module per service. Each `flatten_*` maps an SDK model onto the
//! attribute names of the matching resource or data source schema; absent
//! optional fields become null, never a zero value.

pub mod block_storage;
pub mod compute;
pub mod container_registry;
pub mod dbaas;
pub mod kubernetes;
pub mod network;
pub mod object_storage;
