//! Routing of named operations with string arguments.
//!
//! Requests arrive as a function name plus a list of strings. Mutating
//! functions go through [`Dispatcher::invoke`] and return an empty payload on
//! success; `read` goes through [`Dispatcher::query`] and returns the stored
//! bytes unchanged.

use crate::codec::{decode_line_request, decode_order_request};
use crate::{OrderError, OrderService};
use order_storage::{StorageError, StorageInterface};
use order_types::{OrderId, RecordKey, Status};
use std::sync::Arc;

/// Entry point for `init`, `invoke` and `query` requests.
#[derive(Clone)]
pub struct Dispatcher {
	service: OrderService,
	storage: Arc<dyn StorageInterface>,
}

impl Dispatcher {
	pub fn new(storage: Arc<dyn StorageInterface>) -> Self {
		Self {
			service: OrderService::new(storage.clone()),
			storage,
		}
	}

	pub fn service(&self) -> &OrderService {
		&self.service
	}

	/// Resets the index to empty. Takes one argument, which is ignored.
	pub async fn init(&self, args: &[String]) -> Result<Vec<u8>, OrderError> {
		expect_args("init", args, 1)?;
		self.service.initialize().await?;
		Ok(Vec::new())
	}

	/// Runs a mutating function.
	pub async fn invoke(&self, function: &str, args: &[String]) -> Result<Vec<u8>, OrderError> {
		tracing::debug!(function, args = args.len(), "Invoke");

		match function {
			"init" => self.init(args).await,
			"createOrder" => {
				expect_args(function, args, 1)?;
				let order = decode_order_request(args[0].as_bytes())?;
				self.service.create_order(order).await?;
				Ok(Vec::new())
			},
			"addOrderLines" => {
				expect_at_least(function, args, 2)?;
				let id = parse_order_id(&args[0])?;
				let lines = args[1..]
					.iter()
					.map(|line| decode_line_request(line.as_bytes()))
					.collect::<Result<Vec<_>, _>>()?;
				self.service.add_order_lines(id, lines).await?;
				Ok(Vec::new())
			},
			"deleteOrderLines" => {
				expect_at_least(function, args, 2)?;
				let id = parse_order_id(&args[0])?;
				self.service.delete_order_lines(id, &args[1..]).await?;
				Ok(Vec::new())
			},
			"deleteOrder" => {
				expect_args(function, args, 1)?;
				let id = parse_order_id(&args[0])?;
				self.service.delete_order(id).await?;
				Ok(Vec::new())
			},
			"updateLineStatus" => {
				expect_args(function, args, 3)?;
				let id = parse_order_id(&args[0])?;
				let status = parse_status(&args[2])?;
				self.service
					.update_line_status(id, &args[1], status)
					.await?;
				Ok(Vec::new())
			},
			"updateOrderStatus" => {
				expect_args(function, args, 2)?;
				let id = parse_order_id(&args[0])?;
				let status = parse_status(&args[1])?;
				self.service.update_order_status(id, status).await?;
				Ok(Vec::new())
			},
			"repairIndex" => {
				expect_at_least(function, args, 1)?;
				let ids = args
					.iter()
					.map(|arg| parse_order_id(arg))
					.collect::<Result<Vec<_>, _>>()?;
				let report = self.service.repair_index(&ids).await?;
				serde_json::to_vec(&report).map_err(|e| OrderError::MalformedRecord(e.to_string()))
			},
			_ => {
				tracing::warn!(function, "Invoke did not find function");
				Err(OrderError::UnknownFunction(function.to_string()))
			},
		}
	}

	/// Runs a read-only function.
	pub async fn query(&self, function: &str, args: &[String]) -> Result<Vec<u8>, OrderError> {
		tracing::debug!(function, args = args.len(), "Query");

		match function {
			"read" => {
				expect_args(function, args, 1)?;
				self.read(&args[0]).await
			},
			_ => {
				tracing::warn!(function, "Query did not find function");
				Err(OrderError::UnknownFunction(function.to_string()))
			},
		}
	}

	/// Returns the raw bytes stored under any key.
	///
	/// The index reads as `[]` before it is first written; a missing order
	/// is `OrderNotFound`; any other missing key is `KeyNotFound`.
	pub async fn read(&self, key: &str) -> Result<Vec<u8>, OrderError> {
		match RecordKey::from(key) {
			RecordKey::OrderIndex => self.service.index().read_raw().await,
			RecordKey::Order(id) => self.service.repository().load_raw(id).await,
			RecordKey::Other(key) => match self.storage.get_bytes(&key).await {
				Ok(bytes) => Ok(bytes),
				Err(StorageError::NotFound) => Err(OrderError::KeyNotFound(key)),
				Err(e) => Err(e.into()),
			},
		}
	}
}

fn expect_args(function: &str, args: &[String], expected: usize) -> Result<(), OrderError> {
	if args.len() != expected {
		return Err(OrderError::InvalidArguments(format!(
			"{} expects {} argument(s), got {}",
			function,
			expected,
			args.len()
		)));
	}
	Ok(())
}

fn expect_at_least(function: &str, args: &[String], minimum: usize) -> Result<(), OrderError> {
	if args.len() < minimum {
		return Err(OrderError::InvalidArguments(format!(
			"{} expects at least {} argument(s), got {}",
			function,
			minimum,
			args.len()
		)));
	}
	Ok(())
}

fn parse_order_id(arg: &str) -> Result<OrderId, OrderError> {
	match arg.trim().parse::<OrderId>() {
		Ok(id) if id != 0 => Ok(id),
		_ => Err(OrderError::InvalidArguments(format!(
			"'{}' is not a valid order number",
			arg
		))),
	}
}

fn parse_status(arg: &str) -> Result<Status, OrderError> {
	arg.parse()
		.map_err(|e: order_types::UnknownStatus| OrderError::InvalidArguments(e.to_string()))
}
