//! Loading of configuration split across several files.
//!
//! A file may name others with `include`, relative to its own directory.
//! Every reachable file is read once and merged at the top level; a section
//! may only be defined once across the whole set, and include cycles are
//! rejected.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Loads a configuration file together with its includes.
pub(crate) struct ConfigLoader {
	/// Base path for resolving the main configuration path
	base_path: PathBuf,
	/// Which file defined each top-level section
	section_sources: HashMap<String, PathBuf>,
}

/// A configuration file after env-var expansion.
struct LoadedFile {
	path: PathBuf,
	content: String,
	toml: toml::Value,
	includes: Vec<PathBuf>,
}

impl ConfigLoader {
	pub(crate) fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			section_sources: HashMap::new(),
		}
	}

	pub(crate) async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let root = canonicalize(&resolve_path(&self.base_path, config_path)?)?;

		// Breadth-first over the include graph. A file reached twice, as in a
		// diamond, is read once.
		let mut files: Vec<LoadedFile> = Vec::new();
		let mut queued = HashSet::from([root.clone()]);
		let mut pending = VecDeque::from([root.clone()]);
		while let Some(path) = pending.pop_front() {
			let file = load_file(path).await?;
			for include in &file.includes {
				if queued.insert(include.clone()) {
					pending.push_back(include.clone());
				}
			}
			files.push(file);
		}

		let edges: HashMap<&Path, &[PathBuf]> = files
			.iter()
			.map(|file| (file.path.as_path(), file.includes.as_slice()))
			.collect();
		check_cycles(&root, &edges)?;

		if files.len() == 1 {
			return files[0].content.parse();
		}

		let mut combined = toml::map::Map::new();
		for file in files {
			self.merge_sections(&mut combined, file.toml, &file.path)?;
		}

		let combined = toml::to_string(&toml::Value::Table(combined)).map_err(|e| {
			ConfigError::Parse(format!("Failed to serialize combined config: {}", e))
		})?;
		combined.parse()
	}

	/// Moves the sections of one file into `combined`, rejecting any section
	/// already defined by another file.
	fn merge_sections(
		&mut self,
		combined: &mut toml::map::Map<String, toml::Value>,
		toml: toml::Value,
		source: &Path,
	) -> Result<(), ConfigError> {
		let toml::Value::Table(table) = toml else {
			return Ok(());
		};

		for (key, value) in table {
			if key == "include" {
				continue;
			}
			if let Some(existing_source) = self.section_sources.get(&key) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}. \
					Each top-level section must be unique across all configuration files.",
					key,
					existing_source.display(),
					source.display()
				)));
			}
			self.section_sources
				.insert(key.clone(), source.to_path_buf());
			combined.insert(key, value);
		}
		Ok(())
	}
}

/// Reads one file, resolves environment variables in it and resolves its
/// includes against its own directory.
async fn load_file(path: PathBuf) -> Result<LoadedFile, ConfigError> {
	let content = resolve_env_vars(&tokio::fs::read_to_string(&path).await?)?;
	let toml: toml::Value = toml::from_str(&content)?;

	let dir = path.parent().unwrap_or(Path::new("."));
	let includes = extract_includes(&toml)?
		.into_iter()
		.map(|include| canonicalize(&resolve_path(dir, include)?))
		.collect::<Result<Vec<_>, _>>()?;

	Ok(LoadedFile {
		path,
		content,
		toml,
		includes,
	})
}

/// Fails if any file can reach itself through its includes.
fn check_cycles(root: &Path, edges: &HashMap<&Path, &[PathBuf]>) -> Result<(), ConfigError> {
	fn visit<'a>(
		path: &'a Path,
		edges: &HashMap<&Path, &'a [PathBuf]>,
		active: &mut Vec<&'a Path>,
		done: &mut HashSet<&'a Path>,
	) -> Result<(), ConfigError> {
		if done.contains(path) {
			return Ok(());
		}
		if active.contains(&path) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} includes itself",
				path.display()
			)));
		}

		active.push(path);
		for include in edges.get(path).copied().unwrap_or_default() {
			visit(include, edges, active, done)?;
		}
		active.pop();
		done.insert(path);
		Ok(())
	}

	visit(root, edges, &mut Vec::new(), &mut HashSet::new())
}

fn resolve_path(base: &Path, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
	let path = path.as_ref();
	let resolved = if path.is_absolute() {
		path.to_path_buf()
	} else {
		base.join(path)
	};

	if !resolved.exists() {
		return Err(ConfigError::Io(std::io::Error::new(
			std::io::ErrorKind::NotFound,
			format!("Configuration file not found: {}", resolved.display()),
		)));
	}

	Ok(resolved)
}

fn canonicalize(path: &Path) -> Result<PathBuf, ConfigError> {
	path.canonicalize().map_err(|e| {
		ConfigError::Io(std::io::Error::new(
			std::io::ErrorKind::NotFound,
			format!("Cannot resolve path {}: {}", path.display(), e),
		))
	})
}

fn extract_includes(toml: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match toml.get("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.iter()
			.map(|item| {
				item.as_str().map(PathBuf::from).ok_or_else(|| {
					ConfigError::Validation("Include array must contain only strings".into())
				})
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("config.toml");
		fs::write(
			&config_path,
			r#"
[service]
id = "single"

[storage]
primary = "memory"
[storage.implementations.memory]
"#,
		)
		.unwrap();

		let config = Config::from_file(&config_path).await.unwrap();
		assert_eq!(config.service.id, "single");
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			r#"
include = ["storage.toml"]
[service]
id = "split"
"#,
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("storage.toml"),
			r#"
[storage]
primary = "file"
[storage.implementations.file]
storage_path = "/tmp/orders"
"#,
		)
		.unwrap();

		let config = Config::from_file(temp_dir.path().join("main.toml"))
			.await
			.unwrap();
		assert_eq!(config.service.id, "split");
		assert_eq!(config.storage.primary, "file");
	}

	#[tokio::test]
	async fn test_duplicate_section_rejected() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			r#"
include = "other.toml"
[service]
id = "main"
[storage]
primary = "memory"
[storage.implementations.memory]
"#,
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("other.toml"),
			"[service]\nid = \"other\"\n",
		)
		.unwrap();

		let err = Config::from_file(temp_dir.path().join("main.toml"))
			.await
			.unwrap_err();
		assert!(err.to_string().contains("Duplicate section 'service'"));
	}

	#[tokio::test]
	async fn test_circular_include_rejected() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("a.toml"),
			"include = [\"b.toml\"]\n[service]\nid = \"a\"\n",
		)
		.unwrap();
		fs::write(temp_dir.path().join("b.toml"), "include = [\"a.toml\"]\n").unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("a.toml").await.unwrap_err();
		assert!(err.to_string().contains("Circular include"));
	}

	#[tokio::test]
	async fn test_missing_include_file() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"missing.toml\"]\n[service]\nid = \"x\"\n",
		)
		.unwrap();

		let result = Config::from_file(temp_dir.path().join("main.toml")).await;
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}

	#[tokio::test]
	async fn test_diamond_include_loads_shared_file_once() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"left.toml\", \"right.toml\"]\n[service]\nid = \"diamond\"\n",
		)
		.unwrap();
		fs::write(temp_dir.path().join("left.toml"), "include = \"storage.toml\"\n").unwrap();
		fs::write(temp_dir.path().join("right.toml"), "include = \"storage.toml\"\n").unwrap();
		fs::write(
			temp_dir.path().join("storage.toml"),
			"[storage]\nprimary = \"memory\"\n[storage.implementations.memory]\n",
		)
		.unwrap();

		let config = Config::from_file(temp_dir.path().join("main.toml"))
			.await
			.unwrap();
		assert_eq!(config.service.id, "diamond");
		assert_eq!(config.storage.primary, "memory");
	}

	#[tokio::test]
	async fn test_nested_include_relative_to_including_file() {
		let temp_dir = TempDir::new().unwrap();
		fs::create_dir(temp_dir.path().join("conf")).unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = \"conf/service.toml\"\n[storage]\nprimary = \"memory\"\n[storage.implementations.memory]\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("conf").join("service.toml"),
			"include = \"extra.toml\"\n[service]\nid = \"nested\"\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("conf").join("extra.toml"),
			"[extra]\nnote = \"from conf\"\n",
		)
		.unwrap();

		let config = Config::from_file(temp_dir.path().join("main.toml"))
			.await
			.unwrap();
		assert_eq!(config.service.id, "nested");
	}

	#[tokio::test]
	async fn test_self_include_rejected() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = \"main.toml\"\n[service]\nid = \"x\"\n",
		)
		.unwrap();

		let err = Config::from_file(temp_dir.path().join("main.toml"))
			.await
			.unwrap_err();
		assert!(err.to_string().contains("Circular include"));
	}

	#[test]
	fn test_include_must_be_strings() {
		let toml: toml::Value = toml::from_str("include = [1, 2]").unwrap();
		assert!(extract_includes(&toml).is_err());
	}
}
