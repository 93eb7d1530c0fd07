//! MGC Provider
//!
//! Resource and data source adapters for Magalu Cloud, exposed to the
//! engine through [`MgcProvider`].
//!
//! ## Module Structure
//!
//! - `config` - Provider configuration (explicit attributes, `MGC_*` env)
//! - `context` - Shared clients and the configure handshake
//! - `adapter` - Adapter traits and registry entries
//! - `resources` / `data_sources` - One module per service
//! - `models` - Flattening of SDK responses into attributes
//! - `schemas` - Attribute types shared across schemas
//! - `tfutil` - Conversion, merge, error and polling helpers

pub mod adapter;
pub mod config;
pub mod context;
pub mod data_sources;
pub mod models;
pub mod provider;
pub mod resources;
pub mod schemas;
pub mod tfutil;

// Re-export main types
pub use config::{ProviderConfig, provider_schema};
pub use context::{ConfigureRequest, ProviderContext};
pub use provider::MgcProvider;
