// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role table configuration.
//!
//! Deployments may replace the compiled-in role table with a TOML file:
//!
//! ```toml
//! [roles.viewer]
//! name = "Viewer"
//!
//! [roles.viewer.operations]
//! "table.read" = true
//! "table.update" = false
//! # ... every registered operation
//! ```
//!
//! The table is validated exactly like the built-in one, so a missing entry
//! fails at startup rather than at check time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::operation::OperationRegistry;
use crate::role::{RoleCatalog, RoleCatalogBuilder, RoleUid};

/// Parsed role table, keyed by role uid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleTable {
	#[serde(default)]
	pub roles: BTreeMap<String, RoleTableEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleTableEntry {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default)]
	pub operations: BTreeMap<String, bool>,
}

impl RoleTable {
	pub fn parse(content: &str) -> Result<Self> {
		Ok(toml::from_str(content)?)
	}

	/// Snapshot of an existing catalog, e.g. to write out a starting template.
	pub fn from_catalog(catalog: &RoleCatalog) -> Self {
		let roles = catalog
			.roles()
			.map(|role| {
				let operations = catalog
					.registry()
					.iter()
					.map(|op| (op.id.to_string(), role.allows(op)))
					.collect();
				(
					role.uid.to_string(),
					RoleTableEntry {
						name: Some(role.name.clone()),
						operations,
					},
				)
			})
			.collect();
		Self { roles }
	}

	pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
		toml::to_string_pretty(self)
	}

	/// Validates the table against `registry`.
	///
	/// # Errors
	///
	/// [`crate::RbacError::RoleNotFound`] for an undeclared role uid, plus every
	/// error [`RoleCatalogBuilder::build`] reports.
	pub fn into_catalog(self, registry: OperationRegistry) -> Result<RoleCatalog> {
		let mut builder = RoleCatalogBuilder::new(registry);
		for (key, entry) in self.roles {
			let uid: RoleUid = key.parse()?;
			let name = entry.name.unwrap_or_else(|| uid.to_string());
			builder = builder.role(uid, name, entry.operations);
		}
		builder.build()
	}
}

impl RoleCatalog {
	/// Builds a catalog from a TOML role table.
	pub fn from_toml_str(content: &str, registry: OperationRegistry) -> Result<Self> {
		RoleTable::parse(content)?.into_catalog(registry)
	}
}
