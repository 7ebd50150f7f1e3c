//! Storage keys used by the order catalog.

use crate::OrderId;
use std::fmt;

/// Key of the single record listing every known order number.
pub const ORDER_INDEX_KEY: &str = "OrderKeys";

/// A classified storage key.
///
/// The store only supports exact-key lookups, so every record the catalog
/// writes lives under one of these shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
	/// The order index record.
	OrderIndex,
	/// A single order record, keyed by its decimal order number.
	Order(OrderId),
	/// Any other key. Never written by the catalog, but readable.
	Other(String),
}

impl RecordKey {
	/// Returns the raw key string used against the backend.
	pub fn as_key(&self) -> String {
		match self {
			RecordKey::OrderIndex => ORDER_INDEX_KEY.to_string(),
			RecordKey::Order(id) => id.to_string(),
			RecordKey::Other(key) => key.clone(),
		}
	}
}

impl From<&str> for RecordKey {
	fn from(key: &str) -> Self {
		if key == ORDER_INDEX_KEY {
			return RecordKey::OrderIndex;
		}
		// Only the canonical spelling names an order; "01001" is its own key.
		match key.parse::<OrderId>() {
			Ok(id) if id != 0 && id.to_string() == key => RecordKey::Order(id),
			_ => RecordKey::Other(key.to_string()),
		}
	}
}

impl fmt::Display for RecordKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.as_key())
	}
}
