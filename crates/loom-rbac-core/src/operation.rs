// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Operation registry.
//!
//! An [`Operation`] is an action identifier tagged with the one scope type it is
//! checked against. The [`OperationRegistry`] is filled by explicit
//! [`OperationRegistry::register`] calls at startup and read-only afterwards.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{RbacError, Result};
use crate::types::ScopeType;

/// An identified action scoped to a particular object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Operation {
	pub id: &'static str,
	pub scope_type: ScopeType,
}

impl Operation {
	pub const fn new(id: &'static str, scope_type: ScopeType) -> Self {
		Self { id, scope_type }
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.id)
	}
}

/// Built-in operations.
pub mod ops {
	use super::Operation;
	use crate::types::ScopeType;

	pub const READ_WORKSPACE: Operation = Operation::new("workspace.read", ScopeType::Workspace);
	pub const UPDATE_WORKSPACE: Operation = Operation::new("workspace.update", ScopeType::Workspace);
	pub const DELETE_WORKSPACE: Operation = Operation::new("workspace.delete", ScopeType::Workspace);
	pub const LIST_WORKSPACE_MEMBERS: Operation =
		Operation::new("workspace.list_members", ScopeType::Workspace);
	pub const ASSIGN_ROLE: Operation = Operation::new("workspace.assign_role", ScopeType::Workspace);
	pub const CREATE_DATABASE: Operation =
		Operation::new("workspace.create_database", ScopeType::Workspace);

	pub const READ_DATABASE: Operation = Operation::new("database.read", ScopeType::Database);
	pub const UPDATE_DATABASE: Operation = Operation::new("database.update", ScopeType::Database);
	pub const DELETE_DATABASE: Operation = Operation::new("database.delete", ScopeType::Database);
	pub const CREATE_TABLE: Operation = Operation::new("database.create_table", ScopeType::Database);

	pub const READ_TABLE: Operation = Operation::new("table.read", ScopeType::Table);
	pub const UPDATE_TABLE: Operation = Operation::new("table.update", ScopeType::Table);
	pub const DELETE_TABLE: Operation = Operation::new("table.delete", ScopeType::Table);
	pub const CREATE_ROW: Operation = Operation::new("table.create_row", ScopeType::Table);
	pub const CREATE_VIEW: Operation = Operation::new("table.create_view", ScopeType::Table);

	pub const READ_VIEW: Operation = Operation::new("view.read", ScopeType::View);
	pub const UPDATE_VIEW: Operation = Operation::new("view.update", ScopeType::View);
	pub const DELETE_VIEW: Operation = Operation::new("view.delete", ScopeType::View);

	pub const READ_ROW: Operation = Operation::new("row.read", ScopeType::Row);
	pub const COMMENT_ROW: Operation = Operation::new("row.comment", ScopeType::Row);
	pub const UPDATE_ROW: Operation = Operation::new("row.update", ScopeType::Row);
	pub const DELETE_ROW: Operation = Operation::new("row.delete", ScopeType::Row);

	/// Every built-in operation, in registration order.
	pub const ALL: &[Operation] = &[
		READ_WORKSPACE,
		UPDATE_WORKSPACE,
		DELETE_WORKSPACE,
		LIST_WORKSPACE_MEMBERS,
		ASSIGN_ROLE,
		CREATE_DATABASE,
		READ_DATABASE,
		UPDATE_DATABASE,
		DELETE_DATABASE,
		CREATE_TABLE,
		READ_TABLE,
		UPDATE_TABLE,
		DELETE_TABLE,
		CREATE_ROW,
		CREATE_VIEW,
		READ_VIEW,
		UPDATE_VIEW,
		DELETE_VIEW,
		READ_ROW,
		COMMENT_ROW,
		UPDATE_ROW,
		DELETE_ROW,
	];
}

/// Catalog of known operations keyed by id.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
	operations: BTreeMap<&'static str, Operation>,
}

impl OperationRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a registry holding every built-in operation.
	pub fn builtin() -> Self {
		let mut registry = Self::new();
		for op in ops::ALL {
			registry.operations.insert(op.id, *op);
		}
		registry
	}

	/// Registers an operation. Ids must be unique across all scope types.
	pub fn register(&mut self, operation: Operation) -> Result<()> {
		if self.operations.contains_key(operation.id) {
			return Err(RbacError::DuplicateOperation(operation.id.to_string()));
		}
		self.operations.insert(operation.id, operation);
		Ok(())
	}

	pub fn get(&self, id: &str) -> Result<Operation> {
		self
			.operations
			.get(id)
			.copied()
			.ok_or_else(|| RbacError::OperationNotFound(id.to_string()))
	}

	pub fn contains(&self, id: &str) -> bool {
		self.operations.contains_key(id)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Operation> {
		self.operations.values()
	}

	/// Operations checked against scopes of the given type.
	pub fn for_scope_type(&self, scope_type: ScopeType) -> impl Iterator<Item = &Operation> {
		self
			.operations
			.values()
			.filter(move |op| op.scope_type == scope_type)
	}

	pub fn len(&self) -> usize {
		self.operations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.operations.is_empty()
	}
}
