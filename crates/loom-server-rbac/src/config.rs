// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! RBAC configuration.
//!
//! Layered from multiple sources, lowest precedence first:
//!
//! 1. Built-in defaults (`sqlite:./loom.db`, compiled-in role table)
//! 2. The `[rbac]` table of a TOML config file
//! 3. Environment variables (`LOOM_SERVER_DATABASE_URL`, `LOOM_SERVER_RBAC_ROLE_TABLE`)

use std::path::{Path, PathBuf};

use loom_rbac_core::{OperationRegistry, RoleCatalog};
use serde::Deserialize;
use tracing::{debug, info, trace};

use crate::error::{RbacServerError, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite:./loom.db";

/// RBAC configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RbacConfig {
	pub database_url: String,
	/// TOML role table; the built-in catalog is used when unset.
	pub role_table_path: Option<PathBuf>,
}

impl Default for RbacConfig {
	fn default() -> Self {
		RbacConfigLayer::default().finalize()
	}
}

/// RBAC configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RbacConfigLayer {
	#[serde(default)]
	pub database_url: Option<String>,
	#[serde(default)]
	pub role_table_path: Option<PathBuf>,
}

impl RbacConfigLayer {
	pub fn merge(&mut self, other: RbacConfigLayer) {
		if other.database_url.is_some() {
			self.database_url = other.database_url;
		}
		if other.role_table_path.is_some() {
			self.role_table_path = other.role_table_path;
		}
	}

	pub fn finalize(self) -> RbacConfig {
		RbacConfig {
			database_url: self
				.database_url
				.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
			role_table_path: self.role_table_path,
		}
	}
}

/// Server config files carry many sections; only `[rbac]` is read here.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
	#[serde(default)]
	rbac: Option<RbacConfigLayer>,
}

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<RbacConfigLayer>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<RbacConfigLayer> {
		debug!("loading defaults");
		Ok(RbacConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/loom/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<RbacConfigLayer> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(RbacConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = read_file(&self.path)?;
		let file: ConfigFile = toml::from_str(&content).map_err(|e| RbacServerError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed rbac config layer from TOML");
		Ok(file.rbac.unwrap_or_default())
	}
}

/// Environment variable source.
///
/// Convention: LOOM_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<RbacConfigLayer> {
		debug!("loading environment variables");
		Ok(layer_from_env(|name| std::env::var(name).ok()))
	}
}

fn layer_from_env(lookup: impl Fn(&str) -> Option<String>) -> RbacConfigLayer {
	let var = |name: &str| lookup(name).filter(|s| !s.is_empty());
	RbacConfigLayer {
		database_url: var("LOOM_SERVER_DATABASE_URL"),
		role_table_path: var("LOOM_SERVER_RBAC_ROLE_TABLE").map(PathBuf::from),
	}
}

fn read_file(path: &Path) -> Result<String> {
	std::fs::read_to_string(path).map_err(|e| RbacServerError::FileRead {
		path: path.to_path_buf(),
		source: e,
	})
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<RbacConfig> {
	load_config_from(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from the given sources, applied in precedence order.
pub fn load_config_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<RbacConfig> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = RbacConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	let config = merged.finalize();
	info!(
		role_table = %config
			.role_table_path
			.as_deref()
			.map(|p| p.display().to_string())
			.unwrap_or_else(|| "builtin".to_string()),
		"rbac configuration loaded"
	);
	Ok(config)
}

/// Builds the role catalog named by `config`, validating it against the
/// built-in operation registry. Any defect in the table is an error.
pub fn load_catalog(config: &RbacConfig) -> Result<RoleCatalog> {
	let Some(path) = &config.role_table_path else {
		debug!("using built-in role table");
		return Ok(RoleCatalog::builtin()?);
	};

	debug!(path = %path.display(), "loading role table");
	let content = read_file(path)?;
	let catalog = RoleCatalog::from_toml_str(&content, OperationRegistry::builtin())?;
	info!(path = %path.display(), roles = catalog.roles().count(), "role table loaded");
	Ok(catalog)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	struct FixedSource(Precedence, RbacConfigLayer);

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.0
		}

		fn load(&self) -> Result<RbacConfigLayer> {
			Ok(self.1.clone())
		}
	}

	#[test]
	fn test_defaults() {
		let config = RbacConfig::default();
		assert_eq!(config.database_url, "sqlite:./loom.db");
		assert!(config.role_table_path.is_none());
	}

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut layer = RbacConfigLayer {
			database_url: Some("sqlite:/var/lib/loom/a.db".to_string()),
			role_table_path: Some(PathBuf::from("/etc/loom/roles.toml")),
		};
		layer.merge(RbacConfigLayer {
			database_url: Some("sqlite:/var/lib/loom/b.db".to_string()),
			role_table_path: None,
		});
		let config = layer.finalize();
		assert_eq!(config.database_url, "sqlite:/var/lib/loom/b.db");
		assert_eq!(
			config.role_table_path,
			Some(PathBuf::from("/etc/loom/roles.toml"))
		);
	}

	#[test]
	fn test_environment_overrides_file_regardless_of_order() {
		let config = load_config_from(vec![
			Box::new(FixedSource(
				Precedence::Environment,
				RbacConfigLayer {
					database_url: Some("sqlite:env.db".to_string()),
					role_table_path: None,
				},
			)),
			Box::new(FixedSource(
				Precedence::ConfigFile,
				RbacConfigLayer {
					database_url: Some("sqlite:file.db".to_string()),
					role_table_path: Some(PathBuf::from("roles.toml")),
				},
			)),
		])
		.unwrap();
		assert_eq!(config.database_url, "sqlite:env.db");
		assert_eq!(config.role_table_path, Some(PathBuf::from("roles.toml")));
	}

	#[test]
	fn test_env_layer_ignores_empty_values() {
		let vars: HashMap<&str, &str> = [
			("LOOM_SERVER_DATABASE_URL", ""),
			("LOOM_SERVER_RBAC_ROLE_TABLE", "/etc/loom/roles.toml"),
		]
		.into_iter()
		.collect();
		let layer = layer_from_env(|name| vars.get(name).map(|v| v.to_string()));
		assert!(layer.database_url.is_none());
		assert_eq!(
			layer.role_table_path,
			Some(PathBuf::from("/etc/loom/roles.toml"))
		);
	}

	#[test]
	fn test_toml_source_reads_rbac_section_only() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			"[http]\nport = 8080\n\n[rbac]\ndatabase_url = \"sqlite:/tmp/rbac.db\"\n"
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.database_url.as_deref(), Some("sqlite:/tmp/rbac.db"));
		assert!(layer.role_table_path.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_is_empty() {
		let layer = TomlSource::new("/nonexistent/loom/server.toml")
			.load()
			.unwrap();
		assert!(layer.database_url.is_none());
	}

	#[test]
	fn test_toml_source_parse_error() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[rbac\ndatabase_url = ").unwrap();
		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, RbacServerError::TomlParse { .. }));
	}

	#[test]
	fn test_load_catalog_builtin() {
		let catalog = load_catalog(&RbacConfig::default()).unwrap();
		assert_eq!(catalog.roles().count(), 6);
	}

	#[test]
	fn test_load_catalog_missing_file() {
		let config = RbacConfig {
			database_url: DEFAULT_DATABASE_URL.to_string(),
			role_table_path: Some(PathBuf::from("/nonexistent/roles.toml")),
		};
		assert!(matches!(
			load_catalog(&config),
			Err(RbacServerError::FileRead { .. })
		));
	}
}
