//! Order catalog operations.
//!
//! The service is the only place that sequences writes to the index and to
//! order records. Creation saves the order before indexing it and deletion
//! unindexes it before removing the record, so any interruption leaves at
//! worst an order record that is missing from the index.

use crate::{IndexStore, OrderError, OrderRepository};
use order_storage::StorageInterface;
use order_types::{Order, OrderId, OrderLine, Status, Transition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

/// Changes made to the index by [`OrderService::repair_index`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
	/// Order numbers with a record that were missing from the index.
	pub added: Vec<OrderId>,
	/// Indexed order numbers without a record.
	pub removed: Vec<OrderId>,
}

/// Coordinates the index and the order records.
#[derive(Clone)]
pub struct OrderService {
	index: IndexStore,
	repository: OrderRepository,
}

impl OrderService {
	pub fn new(storage: Arc<dyn StorageInterface>) -> Self {
		Self {
			index: IndexStore::new(storage.clone()),
			repository: OrderRepository::new(storage),
		}
	}

	pub fn index(&self) -> &IndexStore {
		&self.index
	}

	pub fn repository(&self) -> &OrderRepository {
		&self.repository
	}

	/// Writes an empty index. Existing order records are left in place.
	#[instrument(skip_all)]
	pub async fn initialize(&self) -> Result<(), OrderError> {
		self.index.reset().await?;
		tracing::info!("Initialized empty order index");
		Ok(())
	}

	/// Stores a new order with status `SUBMITTED` and indexes it.
	///
	/// Fails with `DuplicateOrder` if a record already exists. In that case
	/// the order number is still added to the index if it is missing, which
	/// completes a previous create that stopped between its two writes.
	#[instrument(skip_all, fields(order_number = order.order_number))]
	pub async fn create_order(&self, mut order: Order) -> Result<Order, OrderError> {
		let id = order.order_number;
		if id == 0 {
			return Err(OrderError::MalformedRecord("order has no orderNumber".into()));
		}
		ensure_unique_parts(id, &[], &order.order_lines)?;

		if self.repository.exists(id).await? {
			if self.index.add(id).await? {
				tracing::warn!("Indexed existing order that was missing from the index");
			}
			return Err(OrderError::DuplicateOrder(id));
		}

		order.order_status = Status::Submitted;
		for line in &mut order.order_lines {
			line.line_status = Status::Submitted;
		}
		order.recompute_totals();
		ensure_finite_totals(&order)?;

		self.repository.save(&order).await?;
		self.index.add(id).await?;

		tracing::info!(
			lines = order.order_lines.len(),
			order_total = order.order_total,
			"Created order"
		);
		Ok(order)
	}

	/// Appends lines to an order. Each new line starts as `SUBMITTED`.
	#[instrument(skip_all, fields(order_number = id))]
	pub async fn add_order_lines(
		&self,
		id: OrderId,
		lines: Vec<OrderLine>,
	) -> Result<Order, OrderError> {
		if lines.is_empty() {
			return Err(OrderError::InvalidArguments(
				"at least one order line is required".into(),
			));
		}

		let mut order = self.repository.load(id).await?;
		ensure_unique_parts(id, &order.order_lines, &lines)?;

		let added = lines.len();
		order.order_lines.extend(lines.into_iter().map(|mut line| {
			line.line_status = Status::Submitted;
			line
		}));
		order.recompute_totals();
		ensure_finite_totals(&order)?;
		self.repository.save(&order).await?;

		tracing::info!(added, order_total = order.order_total, "Added order lines");
		Ok(order)
	}

	/// Removes every line whose part number is listed. Unknown part numbers
	/// are ignored, and an order left without lines is kept.
	#[instrument(skip_all, fields(order_number = id))]
	pub async fn delete_order_lines(
		&self,
		id: OrderId,
		part_numbers: &[String],
	) -> Result<Order, OrderError> {
		let mut order = self.repository.load(id).await?;

		let before = order.order_lines.len();
		order
			.order_lines
			.retain(|line| !part_numbers.contains(&line.part_number));
		order.recompute_totals();
		self.repository.save(&order).await?;

		tracing::info!(
			removed = before - order.order_lines.len(),
			order_total = order.order_total,
			"Deleted order lines"
		);
		Ok(order)
	}

	/// Unindexes an order, then deletes its record.
	///
	/// Fails with `OrderNotFound` only when the order number was neither
	/// indexed nor stored, so a delete interrupted after unindexing can be
	/// retried to remove the leftover record.
	#[instrument(skip_all, fields(order_number = id))]
	pub async fn delete_order(&self, id: OrderId) -> Result<(), OrderError> {
		let was_indexed = self.index.remove(id).await?;
		let existed = self.repository.exists(id).await?;
		if existed {
			self.repository.delete(id).await?;
		}

		if !was_indexed && !existed {
			return Err(OrderError::OrderNotFound(id));
		}
		if !was_indexed {
			tracing::warn!("Deleted order record that was missing from the index");
		}
		tracing::info!("Deleted order");
		Ok(())
	}

	/// Sets the status of one line.
	#[instrument(skip_all, fields(order_number = id, part_number = %part_number, status = %status))]
	pub async fn update_line_status(
		&self,
		id: OrderId,
		part_number: &str,
		status: Status,
	) -> Result<Order, OrderError> {
		let mut order = self.repository.load(id).await?;
		let line = order
			.line_mut(part_number)
			.ok_or_else(|| OrderError::LineNotFound {
				order_number: id,
				part_number: part_number.to_string(),
			})?;

		let from = line.line_status;
		match from.transition_to(status) {
			Transition::Unchanged => {
				tracing::debug!("Line already has requested status");
				return Ok(order);
			},
			Transition::Rejected => {
				return Err(OrderError::InvalidTransition { from, to: status });
			},
			Transition::Allowed => line.line_status = status,
		}

		self.repository.save(&order).await?;
		tracing::info!(from = %from, "Updated line status");
		Ok(order)
	}

	/// Sets the status of an order.
	#[instrument(skip_all, fields(order_number = id, status = %status))]
	pub async fn update_order_status(
		&self,
		id: OrderId,
		status: Status,
	) -> Result<Order, OrderError> {
		let mut order = self.repository.load(id).await?;

		let from = order.order_status;
		match from.transition_to(status) {
			Transition::Unchanged => {
				tracing::debug!("Order already has requested status");
				return Ok(order);
			},
			Transition::Rejected => {
				return Err(OrderError::InvalidTransition { from, to: status });
			},
			Transition::Allowed => order.order_status = status,
		}

		self.repository.save(&order).await?;
		tracing::info!(from = %from, "Updated order status");
		Ok(order)
	}

	/// Brings the index in line with the records for the given order numbers.
	///
	/// The store cannot be enumerated, so the caller names the candidates.
	/// Each candidate with a record is indexed; each without one is
	/// unindexed.
	#[instrument(skip_all, fields(candidates = candidates.len()))]
	pub async fn repair_index(&self, candidates: &[OrderId]) -> Result<RepairReport, OrderError> {
		let mut report = RepairReport::default();
		let mut seen = HashSet::new();

		for &id in candidates {
			if !seen.insert(id) {
				continue;
			}
			if self.repository.exists(id).await? {
				if self.index.add(id).await? {
					report.added.push(id);
				}
			} else if self.index.remove(id).await? {
				report.removed.push(id);
			}
		}

		tracing::info!(
			added = report.added.len(),
			removed = report.removed.len(),
			"Repaired order index"
		);
		Ok(report)
	}
}

/// Rejects an order whose recomputed totals overflowed. Such totals cannot be
/// encoded, and the record would no longer load.
fn ensure_finite_totals(order: &Order) -> Result<(), OrderError> {
	if order.totals_are_finite() {
		return Ok(());
	}
	Err(OrderError::MalformedRecord(format!(
		"order {} totals overflow",
		order.order_number
	)))
}

/// Rejects new lines whose part number is already used on the order or
/// appears twice among the new lines.
fn ensure_unique_parts(
	id: OrderId,
	existing: &[OrderLine],
	new_lines: &[OrderLine],
) -> Result<(), OrderError> {
	let mut parts: HashSet<&str> = existing
		.iter()
		.map(|line| line.part_number.as_str())
		.collect();

	for line in new_lines {
		if !parts.insert(line.part_number.as_str()) {
			return Err(OrderError::DuplicatePartNumber {
				order_number: id,
				part_number: line.part_number.clone(),
			});
		}
	}
	Ok(())
}
