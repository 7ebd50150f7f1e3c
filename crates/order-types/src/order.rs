//! Order records for the catalog.
//!
//! An order owns an ordered list of lines, each identified within the order by
//! its part number. Totals are always derived from quantities and unit prices;
//! values supplied by callers for `lineTotal` and `orderTotal` are overwritten
//! by [`Order::recompute_totals`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Caller-assigned order number. Zero is never a valid identifier.
pub type OrderId = u64;

/// A business order as stored under its own key.
///
/// Missing fields decode to their zero values; the codec rejects records
/// without an order number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
	/// Unique identifier, immutable once created.
	pub order_number: OrderId,
	/// Caller-supplied order date, stored verbatim.
	pub order_date: String,
	/// Who submitted the order.
	pub order_submitter: String,
	/// Caller-supplied target value of the order.
	pub order_value: f64,
	/// Lines in insertion order.
	#[serde(rename = "orderLine")]
	pub order_lines: Vec<OrderLine>,
	/// Sum of every line's `line_total`.
	pub order_total: f64,
	/// Current lifecycle status.
	pub order_status: Status,
}

/// A single line of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderLine {
	/// Identifies the line within its order.
	pub part_number: String,
	pub part_description: String,
	pub quantity: u32,
	pub unit_price: f64,
	/// Always `quantity * unit_price`.
	pub line_total: f64,
	pub line_status: Status,
}

impl OrderLine {
	/// Recomputes `line_total` from quantity and unit price.
	pub fn recompute_total(&mut self) {
		self.line_total = f64::from(self.quantity) * self.unit_price;
	}
}

impl Order {
	/// Returns the line with the given part number, if any.
	pub fn line(&self, part_number: &str) -> Option<&OrderLine> {
		self.order_lines
			.iter()
			.find(|line| line.part_number == part_number)
	}

	pub fn line_mut(&mut self, part_number: &str) -> Option<&mut OrderLine> {
		self.order_lines
			.iter_mut()
			.find(|line| line.part_number == part_number)
	}

	/// Recomputes every line total and then the order total.
	pub fn recompute_totals(&mut self) {
		for line in &mut self.order_lines {
			line.recompute_total();
		}
		self.order_total = self.order_lines.iter().map(|line| line.line_total).sum();
	}

	/// Whether every line total and the order total are finite. Large finite
	/// quantities and prices can still overflow to infinity.
	pub fn totals_are_finite(&self) -> bool {
		self.order_total.is_finite()
			&& self.order_lines.iter().all(|line| line.line_total.is_finite())
	}
}

/// Lifecycle status shared by orders and order lines.
///
/// `Submitted -> InProgress -> Complete`, with `Cancelled` reachable from the
/// two non-terminal states. Transitions are requested explicitly by callers;
/// see [`Status::transition_to`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
	#[default]
	Submitted,
	InProgress,
	Complete,
	Cancelled,
}

/// Outcome of checking a requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
	/// The requested status equals the current one; nothing to write.
	Unchanged,
	/// The change may be applied.
	Allowed,
	/// The current status is terminal and differs from the requested one.
	Rejected,
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl Status {
	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			Status::Submitted => "SUBMITTED",
			Status::InProgress => "IN_PROGRESS",
			Status::Complete => "COMPLETE",
			Status::Cancelled => "CANCELLED",
		}
	}

	/// Returns an iterator over all statuses in lifecycle order.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Submitted,
			Self::InProgress,
			Self::Complete,
			Self::Cancelled,
		]
		.into_iter()
	}

	/// Terminal statuses reject every transition except to themselves.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Status::Complete | Status::Cancelled)
	}

	/// Classifies a caller-directed change from `self` to `to`.
	pub fn transition_to(self, to: Status) -> Transition {
		if self == to {
			Transition::Unchanged
		} else if self.is_terminal() {
			Transition::Rejected
		} else {
			Transition::Allowed
		}
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Status {
	type Err = UnknownStatus;

	/// Accepts the wire names case-insensitively, with `-` or spaces in place
	/// of underscores (`in-progress`, `In Progress`).
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
		Status::all()
			.find(|status| status.as_str() == normalized)
			.ok_or_else(|| UnknownStatus(s.to_string()))
	}
}
