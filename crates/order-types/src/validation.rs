//! Validation of backend configuration tables.
//!
//! Each storage backend receives its own raw TOML table from the
//! configuration file. Backends describe the shape they accept with a
//! [`Schema`] and reject anything else before a backend is constructed.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// The type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
}

/// Custom check run after the type check succeeds.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a [`Schema`].
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a custom validator returning an error message on failure.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	///
	/// The value must be a table, every required field must be present, and
	/// every present field must have the declared type and pass its validator.
	/// Unknown fields are ignored.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn check_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	let mismatch = |expected: &str| ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	};

	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch("string"));
			}
		},
	}

	Ok(())
}

/// A configuration schema that can validate a backend's TOML table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("path", FieldType::String)],
			vec![Field::new("label", FieldType::String)],
		)
	}

	#[test]
	fn test_accepts_valid_table() {
		let config: toml::Value = toml::from_str("path = \"/tmp\"\nlabel = \"x\"").unwrap();
		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let config: toml::Value = toml::from_str("label = \"x\"").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::MissingField(field)) if field == "path"
		));
	}

	#[test]
	fn test_optional_field_type_checked() {
		let config: toml::Value = toml::from_str("path = \"/tmp\"\nlabel = true").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::TypeMismatch { field, .. }) if field == "label"
		));
	}

	#[test]
	fn test_root_must_be_table() {
		let config = toml::Value::String("path".into());
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::TypeMismatch { field, .. }) if field == "root"
		));
	}

	#[test]
	fn test_type_mismatch() {
		let config: toml::Value = toml::from_str("path = 5").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::TypeMismatch { .. })
		));
	}

	#[test]
	fn test_custom_validator() {
		let schema = Schema::new(
			vec![Field::new("path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some("") => Err("must not be empty".to_string()),
					_ => Ok(()),
				}
			})],
			vec![],
		);
		let config: toml::Value = toml::from_str("path = \"\"").unwrap();
		assert!(schema.validate(&config).is_err());
	}
}
