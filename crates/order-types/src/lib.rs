//! Common types for the order catalog.
//!
//! This crate defines the records stored by the order catalog, the status
//! vocabulary shared by orders and their lines, the well-known storage keys,
//! and the TOML schema helpers used to validate backend configuration.

/// Order and order line records plus their status lifecycle.
pub mod order;
/// Registry trait for implementations selected by name in configuration.
pub mod registry;
/// Well-known storage keys.
pub mod storage;
/// Configuration validation types.
pub mod validation;

pub use order::*;
pub use registry::ImplementationRegistry;
pub use storage::*;
pub use validation::*;
