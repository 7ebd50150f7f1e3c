//! JSON encoding of stored records and request payloads.
//!
//! Decoding ignores unknown fields and fills missing ones with zero values,
//! but an order without a non-zero `orderNumber` cannot be represented and is
//! always rejected, as is a line without a part number.
//!
//! Request payloads go through the `*_request` decoders, which also accept a
//! blank or `null` status and a `null` line list. Stored records are decoded
//! strictly.

use crate::OrderError;
use order_types::{Order, OrderId, OrderLine};
use serde_json::Value;
use std::collections::HashSet;

/// Decodes and validates an order.
pub fn decode_order(bytes: &[u8]) -> Result<Order, OrderError> {
	let order: Order = serde_json::from_slice(bytes)
		.map_err(|e| OrderError::MalformedRecord(format!("invalid order: {}", e)))?;
	validate_order(&order)?;
	Ok(order)
}

/// Encodes an order for storage.
pub fn encode_order(order: &Order) -> Result<Vec<u8>, OrderError> {
	serde_json::to_vec(order).map_err(|e| OrderError::MalformedRecord(e.to_string()))
}

/// Decodes and validates an order supplied with a request.
pub fn decode_order_request(bytes: &[u8]) -> Result<Order, OrderError> {
	let mut value: Value = serde_json::from_slice(bytes)
		.map_err(|e| OrderError::MalformedRecord(format!("invalid order: {}", e)))?;

	clear_blank(&mut value, "orderStatus");
	clear_blank(&mut value, "orderLine");
	if let Some(lines) = value.get_mut("orderLine").and_then(Value::as_array_mut) {
		for line in lines {
			clear_blank(line, "lineStatus");
		}
	}

	let order: Order = serde_json::from_value(value)
		.map_err(|e| OrderError::MalformedRecord(format!("invalid order: {}", e)))?;
	validate_order(&order)?;
	Ok(order)
}

/// Decodes and validates an order line supplied with a request.
pub fn decode_line_request(bytes: &[u8]) -> Result<OrderLine, OrderError> {
	let mut value: Value = serde_json::from_slice(bytes)
		.map_err(|e| OrderError::MalformedRecord(format!("invalid order line: {}", e)))?;
	clear_blank(&mut value, "lineStatus");

	let line: OrderLine = serde_json::from_value(value)
		.map_err(|e| OrderError::MalformedRecord(format!("invalid order line: {}", e)))?;
	validate_line(&line)?;
	Ok(line)
}

/// Drops `field` from an object when it is `null` or a blank string, so it
/// decodes to its default.
fn clear_blank(value: &mut Value, field: &str) {
	let Some(object) = value.as_object_mut() else {
		return;
	};
	let blank = match object.get(field) {
		Some(Value::Null) => true,
		Some(Value::String(s)) => s.trim().is_empty(),
		_ => false,
	};
	if blank {
		object.remove(field);
	}
}

/// Decodes the index record.
///
/// `null` reads as an empty index. Repeated identifiers are collapsed,
/// keeping the first occurrence.
pub fn decode_index(bytes: &[u8]) -> Result<Vec<OrderId>, OrderError> {
	let ids: Option<Vec<OrderId>> = serde_json::from_slice(bytes)
		.map_err(|e| OrderError::MalformedRecord(format!("invalid order index: {}", e)))?;

	let mut seen = HashSet::new();
	let mut index = Vec::new();
	for id in ids.unwrap_or_default() {
		if id == 0 {
			return Err(OrderError::MalformedRecord(
				"order index contains order number 0".into(),
			));
		}
		if seen.insert(id) {
			index.push(id);
		}
	}
	Ok(index)
}

pub fn encode_index(ids: &[OrderId]) -> Result<Vec<u8>, OrderError> {
	serde_json::to_vec(ids).map_err(|e| OrderError::MalformedRecord(e.to_string()))
}

fn validate_order(order: &Order) -> Result<(), OrderError> {
	if order.order_number == 0 {
		return Err(OrderError::MalformedRecord(
			"order has no orderNumber".into(),
		));
	}
	if !order.order_value.is_finite() {
		return Err(OrderError::MalformedRecord(format!(
			"order {} has a non-finite orderValue",
			order.order_number
		)));
	}
	for line in &order.order_lines {
		validate_line(line)?;
	}
	Ok(())
}

fn validate_line(line: &OrderLine) -> Result<(), OrderError> {
	if line.part_number.trim().is_empty() {
		return Err(OrderError::MalformedRecord(
			"order line has no partNumber".into(),
		));
	}
	if !line.unit_price.is_finite() || line.unit_price < 0.0 {
		return Err(OrderError::MalformedRecord(format!(
			"order line '{}' has an invalid unitPrice {}",
			line.part_number, line.unit_price
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use order_types::Status;

	#[test]
	fn test_decode_full_order() {
		let json = br#"{
			"orderNumber": 1001,
			"orderDate": "2016-10-01",
			"orderSubmitter": "acme",
			"orderValue": 25.5,
			"orderLine": [
				{"partNumber": "A1", "partDescription": "bolt", "quantity": 2, "unitPrice": 10.0, "lineStatus": "IN_PROGRESS"}
			],
			"orderStatus": "SUBMITTED"
		}"#;

		let order = decode_order(json).unwrap();
		assert_eq!(order.order_number, 1001);
		assert_eq!(order.order_submitter, "acme");
		assert_eq!(order.order_lines.len(), 1);
		assert_eq!(order.order_lines[0].quantity, 2);
		assert_eq!(order.order_lines[0].line_status, Status::InProgress);
	}

	#[test]
	fn test_missing_optional_fields_take_zero_values() {
		let order = decode_order(br#"{"orderNumber": 7, "extra": true}"#).unwrap();
		assert_eq!(order.order_number, 7);
		assert!(order.order_lines.is_empty());
		assert_eq!(order.order_status, Status::Submitted);
		assert_eq!(order.order_date, "");
	}

	#[test]
	fn test_order_number_is_required() {
		for json in [
			&br#"{"orderDate": "today"}"#[..],
			br#"{"orderNumber": 0}"#,
			br#"{"orderNumber": -4}"#,
			br#"{"orderNumber": "1001"}"#,
			b"not json",
		] {
			assert!(
				matches!(decode_order(json), Err(OrderError::MalformedRecord(_))),
				"accepted {}",
				String::from_utf8_lossy(json)
			);
		}
	}

	#[test]
	fn test_invalid_lines_rejected() {
		for json in [
			&br#"{"orderNumber": 1, "orderLine": [{"quantity": 1}]}"#[..],
			br#"{"orderNumber": 1, "orderLine": [{"partNumber": "A", "quantity": -1}]}"#,
			br#"{"orderNumber": 1, "orderLine": [{"partNumber": "A", "unitPrice": -0.5}]}"#,
			br#"{"orderNumber": 1, "orderLine": [{"partNumber": "A", "lineStatus": "SHIPPED"}]}"#,
		] {
			assert!(matches!(
				decode_order(json),
				Err(OrderError::MalformedRecord(_))
			));
		}
	}

	#[test]
	fn test_request_accepts_blank_statuses() {
		let order = decode_order_request(
			br#"{"orderNumber": 8, "orderStatus": "", "orderLine": [{"partNumber": "A1", "lineStatus": ""}]}"#,
		)
		.unwrap();
		assert_eq!(order.order_status, Status::Submitted);
		assert_eq!(order.order_lines[0].line_status, Status::Submitted);

		let order =
			decode_order_request(br#"{"orderNumber": 9, "orderStatus": null, "orderLine": null}"#)
				.unwrap();
		assert!(order.order_lines.is_empty());

		let line = decode_line_request(br#"{"partNumber": "B2", "lineStatus": " "}"#).unwrap();
		assert_eq!(line.line_status, Status::Submitted);
	}

	#[test]
	fn test_request_still_rejects_bad_payloads() {
		for json in [
			&br#"{"orderNumber": 8, "orderStatus": "SHIPPED"}"#[..],
			br#"{"orderStatus": ""}"#,
			br#"[1, 2]"#,
			b"{",
		] {
			assert!(matches!(
				decode_order_request(json),
				Err(OrderError::MalformedRecord(_))
			));
		}
		assert!(decode_line_request(br#"{"partNumber": "", "lineStatus": ""}"#).is_err());
	}

	#[test]
	fn test_stored_records_keep_strict_status() {
		assert!(decode_order(br#"{"orderNumber": 8, "orderStatus": ""}"#).is_err());
		assert!(
			decode_order(br#"{"orderNumber": 8, "orderLine": [{"partNumber": "A1", "lineStatus": ""}]}"#)
				.is_err()
		);
	}

	#[test]
	fn test_decode_line() {
		let line =
			decode_line_request(br#"{"partNumber": "B2", "quantity": 3, "unitPrice": 1.5}"#).unwrap();
		assert_eq!(line.part_number, "B2");
		assert!(decode_line_request(br#"{"partNumber": ""}"#).is_err());
	}

	#[test]
	fn test_encoded_field_names() {
		let mut order = decode_order(
			br#"{"orderNumber": 1001, "orderLine": [{"partNumber": "A1", "quantity": 2, "unitPrice": 10.0}]}"#,
		)
		.unwrap();
		order.recompute_totals();

		let value: serde_json::Value = serde_json::from_slice(&encode_order(&order).unwrap()).unwrap();
		assert_eq!(value["orderNumber"], 1001);
		assert_eq!(value["orderTotal"], 20.0);
		assert_eq!(value["orderStatus"], "SUBMITTED");
		assert_eq!(value["orderLine"][0]["lineTotal"], 20.0);
		assert_eq!(value["orderLine"][0]["partNumber"], "A1");
	}

	#[test]
	fn test_index_decoding() {
		assert_eq!(decode_index(b"[]").unwrap(), Vec::<OrderId>::new());
		assert_eq!(decode_index(b"null").unwrap(), Vec::<OrderId>::new());
		assert_eq!(decode_index(b"[3, 1, 3, 2]").unwrap(), vec![3, 1, 2]);
		assert!(decode_index(b"[0]").is_err());
		assert!(decode_index(b"{\"keys\": []}").is_err());
		assert_eq!(encode_index(&[1001, 1002]).unwrap(), b"[1001,1002]");
	}
}
