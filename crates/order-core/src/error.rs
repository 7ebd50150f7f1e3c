//! Errors surfaced by catalog operations.

use order_storage::StorageError;
use order_types::{OrderId, Status};
use thiserror::Error;

/// Every way a catalog operation can fail.
///
/// Only [`OrderError::StoreUnavailable`] is transient. Everything else is
/// either a caller mistake or a report about the current stored state.
#[derive(Debug, Error)]
pub enum OrderError {
	#[error("Invalid arguments: {0}")]
	InvalidArguments(String),
	#[error("Malformed record: {0}")]
	MalformedRecord(String),
	#[error("Order not found: {0}")]
	OrderNotFound(OrderId),
	#[error("Line '{part_number}' not found on order {order_number}")]
	LineNotFound {
		order_number: OrderId,
		part_number: String,
	},
	#[error("Order already exists: {0}")]
	DuplicateOrder(OrderId),
	#[error("Part number '{part_number}' already exists on order {order_number}")]
	DuplicatePartNumber {
		order_number: OrderId,
		part_number: String,
	},
	#[error("Invalid status transition from {from} to {to}")]
	InvalidTransition { from: Status, to: Status },
	#[error("Store unavailable: {0}")]
	StoreUnavailable(String),
	#[error("Unknown function: {0}")]
	UnknownFunction(String),
	#[error("No record stored under key '{0}'")]
	KeyNotFound(String),
}

impl OrderError {
	/// Whether retrying the whole operation unchanged may succeed.
	pub fn is_retryable(&self) -> bool {
		matches!(self, OrderError::StoreUnavailable(_))
	}

	/// Stable name of the error kind, for logs and exit reporting.
	pub fn kind(&self) -> &'static str {
		match self {
			OrderError::InvalidArguments(_) => "InvalidArguments",
			OrderError::MalformedRecord(_) => "MalformedRecord",
			OrderError::OrderNotFound(_) => "OrderNotFound",
			OrderError::LineNotFound { .. } => "LineNotFound",
			OrderError::DuplicateOrder(_) => "DuplicateOrder",
			OrderError::DuplicatePartNumber { .. } => "DuplicatePartNumber",
			OrderError::InvalidTransition { .. } => "InvalidTransition",
			OrderError::StoreUnavailable(_) => "StoreUnavailable",
			OrderError::UnknownFunction(_) => "UnknownFunction",
			OrderError::KeyNotFound(_) => "KeyNotFound",
		}
	}
}

/// Storage failures become [`OrderError::StoreUnavailable`].
///
/// Components that give `StorageError::NotFound` a meaning (an empty index, a
/// missing order) match on it before converting.
impl From<StorageError> for OrderError {
	fn from(err: StorageError) -> Self {
		OrderError::StoreUnavailable(err.to_string())
	}
}
