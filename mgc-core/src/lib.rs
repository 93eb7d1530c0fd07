//! MGC Core
//!
//! Engine-facing model shared by the Magalu Cloud provider crates: attribute
//! values, resource state, schemas, diagnostics and the `Provider` trait.

pub mod diagnostic;
pub mod provider;
pub mod resource;
pub mod schema;
