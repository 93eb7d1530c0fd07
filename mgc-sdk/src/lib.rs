//! MGC SDK
//!
//! Typed clients for the Magalu Cloud REST APIs.
//!
//! ## Module Structure
//!
//! - `config` - Region / environment to endpoint resolution
//! - `client` - Authenticated HTTP client with bounded retries
//! - `error` - SDK error taxonomy
//! - `pagination` - Offset/limit paging helper
//! - one module per service (`compute`, `block_storage`, `network`,
//!   `kubernetes`, `dbaas`, `container_registry`, `object_storage`)

pub mod block_storage;
pub mod client;
pub mod common;
pub mod compute;
pub mod config;
pub mod container_registry;
pub mod dbaas;
pub mod error;
pub mod kubernetes;
pub mod network;
pub mod object_storage;
pub mod pagination;

// Re-export main types
pub use client::Client;
pub use config::{ClientConfig, DEFAULT_ENV, DEFAULT_REGION, region_to_s3_url, region_to_url};
pub use error::{HttpError, Result, RetryError, SdkError, ValidationError};
pub use pagination::{DEFAULT_PAGE_LIMIT, paginate};

pub use block_storage::BlockStorageClient;
pub use compute::ComputeClient;
pub use container_registry::ContainerRegistryClient;
pub use dbaas::DbaasClient;
pub use kubernetes::KubernetesClient;
pub use network::NetworkClient;
pub use object_storage::ObjectStorageClient;
