//! Storage wrapper that fails on demand, for exercising partial failures.

use async_trait::async_trait;
use order_storage::implementations::memory::MemoryStorage;
use order_storage::{StorageError, StorageInterface};
use order_types::ConfigSchema;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct FlakyStorage {
	inner: MemoryStorage,
	failing_keys: Mutex<HashSet<String>>,
	failing_reads: AtomicBool,
}

impl FlakyStorage {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Makes every later write or delete of `key` fail.
	pub(crate) fn fail_writes_to(&self, key: &str) {
		self.failing_keys.lock().unwrap().insert(key.to_string());
	}

	pub(crate) fn fail_reads(&self) {
		self.failing_reads.store(true, Ordering::SeqCst);
	}

	pub(crate) fn heal(&self) {
		self.failing_keys.lock().unwrap().clear();
		self.failing_reads.store(false, Ordering::SeqCst);
	}

	fn check_write(&self, key: &str) -> Result<(), StorageError> {
		if self.failing_keys.lock().unwrap().contains(key) {
			return Err(StorageError::Backend(format!("injected write failure for {}", key)));
		}
		Ok(())
	}

	fn check_read(&self) -> Result<(), StorageError> {
		if self.failing_reads.load(Ordering::SeqCst) {
			return Err(StorageError::Backend("injected read failure".into()));
		}
		Ok(())
	}
}

#[async_trait]
impl StorageInterface for FlakyStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.check_read()?;
		self.inner.get_bytes(key).await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.check_write(key)?;
		self.inner.set_bytes(key, value).await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.check_write(key)?;
		self.inner.delete(key).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		self.check_read()?;
		self.inner.exists(key).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		self.inner.config_schema()
	}
}
