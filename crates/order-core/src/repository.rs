//! Per-order records.
//!
//! Each order lives under its own key, the decimal order number. The
//! repository knows nothing about the index.

use crate::codec::{decode_order, encode_order};
use crate::OrderError;
use order_storage::{StorageError, StorageInterface};
use order_types::{Order, OrderId, RecordKey};
use std::sync::Arc;

#[derive(Clone)]
pub struct OrderRepository {
	storage: Arc<dyn StorageInterface>,
}

impl OrderRepository {
	pub fn new(storage: Arc<dyn StorageInterface>) -> Self {
		Self { storage }
	}

	/// Loads and decodes an order, failing with `OrderNotFound` if absent.
	pub async fn load(&self, id: OrderId) -> Result<Order, OrderError> {
		let bytes = self.load_raw(id).await?;
		let order = decode_order(&bytes)?;
		if order.order_number != id {
			return Err(OrderError::MalformedRecord(format!(
				"record stored under {} holds order {}",
				id, order.order_number
			)));
		}
		Ok(order)
	}

	/// Returns the stored bytes of an order without decoding them.
	pub async fn load_raw(&self, id: OrderId) -> Result<Vec<u8>, OrderError> {
		match self.storage.get_bytes(&RecordKey::Order(id).as_key()).await {
			Ok(bytes) => Ok(bytes),
			Err(StorageError::NotFound) => Err(OrderError::OrderNotFound(id)),
			Err(e) => Err(e.into()),
		}
	}

	pub async fn exists(&self, id: OrderId) -> Result<bool, OrderError> {
		Ok(self.storage.exists(&RecordKey::Order(id).as_key()).await?)
	}

	/// Writes the order under its own order number, replacing any previous
	/// record.
	pub async fn save(&self, order: &Order) -> Result<(), OrderError> {
		let bytes = encode_order(order)?;
		self.storage
			.set_bytes(&RecordKey::Order(order.order_number).as_key(), bytes)
			.await?;
		Ok(())
	}

	/// Deletes an order record. Deleting an absent record succeeds.
	pub async fn delete(&self, id: OrderId) -> Result<(), OrderError> {
		self.storage
			.delete(&RecordKey::Order(id).as_key())
			.await?;
		Ok(())
	}
}
