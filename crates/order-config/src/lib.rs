//! Configuration for the order catalog service.
//!
//! Configuration is read from TOML. String values may reference environment
//! variables as `${NAME}` or `${NAME:-default}`.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the default Display repeats the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance.
	pub service: ServiceConfig,
	/// Storage backend selection.
	pub storage: StorageConfig,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Identifier used in logs.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of storage implementation names to their raw configuration tables.
	pub implementations: HashMap<String, toml::Value>,
}

impl StorageConfig {
	/// Returns the configuration table of the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME` and supports defaults
/// with `${VAR_NAME:-default_value}`. Input is limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path.file_name().ok_or_else(|| {
			ConfigError::Validation(format!("Invalid path: {}", path.display()))
		})?;

		let mut loader = loader::ConfigLoader::new(base_dir);
		loader.load_config(file_name).await
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if self.storage.primary_config().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[service]
id = "orders-test"

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_parse_minimal_config() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.service.id, "orders-test");
		assert_eq!(config.storage.primary, "memory");
		assert!(config.storage.primary_config().is_some());
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("ORDERS_TEST_DIR", "/var/lib/orders");

		let input = "storage_path = \"${ORDERS_TEST_DIR}/data\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "storage_path = \"/var/lib/orders/data\"");

		std::env::remove_var("ORDERS_TEST_DIR");
	}

	#[test]
	fn test_env_var_default_value() {
		let input = "storage_path = \"${ORDERS_UNSET_VAR_XYZ:-./data/orders}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "storage_path = \"./data/orders\"");
	}

	#[test]
	fn test_missing_env_var_without_default() {
		let input = "id = \"${ORDERS_UNSET_VAR_ABC}\"";
		assert!(matches!(
			resolve_env_vars(input),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_rejects_empty_service_id() {
		let input = MINIMAL.replace("orders-test", " ");
		assert!(matches!(
			input.parse::<Config>(),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_rejects_unknown_primary_storage() {
		let input = MINIMAL.replace("primary = \"memory\"", "primary = \"file\"");
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("'file' not found"));
	}

	#[test]
	fn test_rejects_missing_section() {
		let input = "[service]\nid = \"x\"\n";
		assert!(matches!(input.parse::<Config>(), Err(ConfigError::Parse(_))));
	}
}
