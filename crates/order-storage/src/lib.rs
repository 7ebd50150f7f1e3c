//! Key-value storage backends for the order catalog.
//!
//! The catalog only ever needs single-key reads and writes. Backends expose
//! exactly that through [`StorageInterface`]; there is deliberately no way to
//! enumerate keys or to write several keys atomically, so callers must keep
//! their own index and order their writes.

use async_trait::async_trait;
use order_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// No value is stored under the requested key.
	#[error("Not found")]
	NotFound,
	/// The backend failed to read or write.
	#[error("Backend error: {0}")]
	Backend(String),
	/// The backend configuration was rejected.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface every storage backend implements.
///
/// Each call is atomic for its single key. Nothing is guaranteed across keys.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key, or [`StorageError::NotFound`].
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value under the given key. Deleting an absent key succeeds.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Signature every storage implementation's factory provides.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations as `(name, factory)` pairs.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}
