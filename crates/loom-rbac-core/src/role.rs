// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Roles and the role catalog.
//!
//! A [`Role`] is plain data: a name and an allow/deny default for every
//! registered operation. The [`RoleCatalog`] is built once at startup through
//! [`RoleCatalogBuilder`], which refuses any role whose map is not total over
//! the [`OperationRegistry`], and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{RbacError, Result};
use crate::operation::{Operation, OperationRegistry};

/// Identifiers of the roles known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleUid {
	/// Everything, including role management.
	Admin,
	/// Can change structure: databases, tables and views.
	Builder,
	/// Can change data but not structure.
	Editor,
	/// Read access plus row comments.
	Commenter,
	/// Read-only access.
	Viewer,
	/// Explicit denial of everything, also the baseline for subjects without assignments.
	NoAccess,
}

impl RoleUid {
	/// The role used when a subject has no assignment anywhere in a scope chain.
	pub const BASELINE: RoleUid = RoleUid::NoAccess;

	/// Returns all role identifiers.
	pub fn all() -> &'static [RoleUid] {
		&[
			RoleUid::Admin,
			RoleUid::Builder,
			RoleUid::Editor,
			RoleUid::Commenter,
			RoleUid::Viewer,
			RoleUid::NoAccess,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			RoleUid::Admin => "admin",
			RoleUid::Builder => "builder",
			RoleUid::Editor => "editor",
			RoleUid::Commenter => "commenter",
			RoleUid::Viewer => "viewer",
			RoleUid::NoAccess => "no_access",
		}
	}
}

impl fmt::Display for RoleUid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for RoleUid {
	type Err = RbacError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"admin" => Ok(RoleUid::Admin),
			"builder" => Ok(RoleUid::Builder),
			"editor" => Ok(RoleUid::Editor),
			"commenter" => Ok(RoleUid::Commenter),
			"viewer" => Ok(RoleUid::Viewer),
			"no_access" => Ok(RoleUid::NoAccess),
			_ => Err(RbacError::RoleNotFound(s.to_string())),
		}
	}
}

/// A named, static set of allow/deny defaults over all operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
	pub uid: RoleUid,
	pub name: String,
	operations: BTreeMap<&'static str, bool>,
}

impl Role {
	/// Default decision for `operation`. Anything unspecified is denied.
	pub fn allows(&self, operation: &Operation) -> bool {
		self.operations.get(operation.id).copied().unwrap_or(false)
	}

	/// Ids of every operation this role allows.
	pub fn allowed_operations(&self) -> impl Iterator<Item = &'static str> + '_ {
		self
			.operations
			.iter()
			.filter(|(_, allowed)| **allowed)
			.map(|(id, _)| *id)
	}
}

/// Read-only catalog of roles, total over its operation registry.
#[derive(Debug, Clone)]
pub struct RoleCatalog {
	registry: OperationRegistry,
	roles: HashMap<RoleUid, Role>,
}

impl RoleCatalog {
	/// Catalog built from the compiled-in role table.
	pub fn builtin() -> Result<Self> {
		crate::builtin::catalog_builder(OperationRegistry::builtin()).build()
	}

	pub fn get_role(&self, uid: RoleUid) -> Result<&Role> {
		self
			.roles
			.get(&uid)
			.ok_or_else(|| RbacError::RoleNotFound(uid.to_string()))
	}

	/// The statically configured default of `role` for `operation`.
	pub fn default_decision(&self, role: RoleUid, operation: &Operation) -> Result<bool> {
		Ok(self.get_role(role)?.allows(operation))
	}

	/// The role applied when no assignment is found.
	pub fn baseline(&self) -> &Role {
		&self.roles[&RoleUid::BASELINE]
	}

	pub fn registry(&self) -> &OperationRegistry {
		&self.registry
	}

	pub fn operation(&self, id: &str) -> Result<Operation> {
		self.registry.get(id)
	}

	pub fn roles(&self) -> impl Iterator<Item = &Role> {
		self.roles.values()
	}
}

/// Collects role declarations and validates them into a [`RoleCatalog`].
#[derive(Debug)]
pub struct RoleCatalogBuilder {
	registry: OperationRegistry,
	declarations: BTreeMap<RoleUid, (String, BTreeMap<String, bool>)>,
}

impl RoleCatalogBuilder {
	pub fn new(registry: OperationRegistry) -> Self {
		Self {
			registry,
			declarations: BTreeMap::new(),
		}
	}

	/// Declares a role, replacing any earlier declaration with the same uid.
	pub fn role<I, S>(mut self, uid: RoleUid, name: impl Into<String>, decisions: I) -> Self
	where
		I: IntoIterator<Item = (S, bool)>,
		S: Into<String>,
	{
		let decisions = decisions
			.into_iter()
			.map(|(op, allowed)| (op.into(), allowed))
			.collect();
		self.declarations.insert(uid, (name.into(), decisions));
		self
	}

	/// Validates every declaration.
	///
	/// # Errors
	///
	/// - [`RbacError::OperationNotFound`] if a role names an unregistered operation
	/// - [`RbacError::IncompleteRole`] if a role leaves a registered operation out
	/// - [`RbacError::RoleNotFound`] if the baseline role is not declared
	pub fn build(self) -> Result<RoleCatalog> {
		let mut roles = HashMap::with_capacity(self.declarations.len());

		for (uid, (name, decisions)) in self.declarations {
			let mut operations = BTreeMap::new();
			for (id, allowed) in decisions {
				let op = self.registry.get(&id)?;
				operations.insert(op.id, allowed);
			}
			if let Some(missing) = self.registry.iter().find(|op| !operations.contains_key(op.id)) {
				return Err(RbacError::IncompleteRole {
					role: uid.to_string(),
					operation: missing.id.to_string(),
				});
			}
			roles.insert(uid, Role { uid, name, operations });
		}

		if !roles.contains_key(&RoleUid::BASELINE) {
			return Err(RbacError::RoleNotFound(RoleUid::BASELINE.to_string()));
		}

		tracing::debug!(
			roles = roles.len(),
			operations = self.registry.len(),
			"role catalog built"
		);
		Ok(RoleCatalog {
			registry: self.registry,
			roles,
		})
	}
}
