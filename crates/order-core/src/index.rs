//! The order index record.
//!
//! The store cannot list its keys, so the set of existing orders is kept as a
//! single record under [`ORDER_INDEX_KEY`]. This is the only component that
//! reads or writes that key. Nothing is cached: every call reads the current
//! value from the store.

use crate::codec::{decode_index, encode_index};
use crate::OrderError;
use order_storage::{StorageError, StorageInterface};
use order_types::{OrderId, ORDER_INDEX_KEY};
use std::sync::Arc;

/// Read-modify-write access to the order index.
#[derive(Clone)]
pub struct IndexStore {
	storage: Arc<dyn StorageInterface>,
}

impl IndexStore {
	pub fn new(storage: Arc<dyn StorageInterface>) -> Self {
		Self { storage }
	}

	/// Returns the indexed order numbers in insertion order.
	///
	/// An absent record is an empty index.
	pub async fn load(&self) -> Result<Vec<OrderId>, OrderError> {
		match self.storage.get_bytes(ORDER_INDEX_KEY).await {
			Ok(bytes) => decode_index(&bytes),
			Err(StorageError::NotFound) => Ok(Vec::new()),
			Err(e) => Err(e.into()),
		}
	}

	pub async fn contains(&self, id: OrderId) -> Result<bool, OrderError> {
		Ok(self.load().await?.contains(&id))
	}

	/// Adds an order number. Returns `false` without writing if it was
	/// already present.
	pub async fn add(&self, id: OrderId) -> Result<bool, OrderError> {
		let mut ids = self.load().await?;
		if ids.contains(&id) {
			tracing::debug!(order_number = id, "Order already indexed");
			return Ok(false);
		}
		ids.push(id);
		self.write(&ids).await?;
		Ok(true)
	}

	/// Removes an order number. Returns `false` without writing if it was
	/// not present.
	pub async fn remove(&self, id: OrderId) -> Result<bool, OrderError> {
		let mut ids = self.load().await?;
		let before = ids.len();
		ids.retain(|existing| *existing != id);
		if ids.len() == before {
			tracing::debug!(order_number = id, "Order not indexed");
			return Ok(false);
		}
		self.write(&ids).await?;
		Ok(true)
	}

	/// Overwrites the index with an empty one.
	pub async fn reset(&self) -> Result<(), OrderError> {
		self.write(&[]).await
	}

	/// Returns the stored bytes, or the encoding of an empty index when the
	/// record has never been written.
	pub async fn read_raw(&self) -> Result<Vec<u8>, OrderError> {
		match self.storage.get_bytes(ORDER_INDEX_KEY).await {
			Ok(bytes) => Ok(bytes),
			Err(StorageError::NotFound) => encode_index(&[]),
			Err(e) => Err(e.into()),
		}
	}

	async fn write(&self, ids: &[OrderId]) -> Result<(), OrderError> {
		let bytes = encode_index(ids)?;
		self.storage.set_bytes(ORDER_INDEX_KEY, bytes).await?;
		Ok(())
	}
}
