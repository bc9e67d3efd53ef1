// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bulk permission objects.
//!
//! Checking thousands of objects one at a time repeats the same ancestor walk
//! and role lookup for every object. A [`PermissionObject`] answers the same
//! question for a whole collection as `{default, exceptions}`: an object is
//! allowed iff `default` differs from whether its id is an exception.
//!
//! [`BulkPermissionBuilder`] computes one from a subject's assignments:
//!
//! 1. `default` comes from the role assigned at the root-most scope that can
//!    contain the operation's targets, or from the baseline role
//! 2. assignments made directly on objects of the operation's scope type seed
//!    the exceptions
//! 3. [`BulkPermissionBuilder::expand`] resolves each candidate's own nearest
//!    assignment and records it when it differs from `default`; ancestor
//!    results are memoised so each scope in the tree is walked at most once
//!
//! Only seeded and expanded ids are answered from `{default, exceptions}`.
//! Any other id gets the baseline decision, the answer for a scope with no
//! assignment in its chain. With the built-in roles that is a denial, so an
//! id that was never expanded is filtered out rather than let through.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::error::{RbacError, Result};
use crate::operation::Operation;
use crate::resolve::{validate_operation_scope, AssignmentIndex};
use crate::role::{RoleCatalog, RoleUid};
use crate::scope::{blame, checked_parent, ScopeTree, MAX_SCOPE_DEPTH};
use crate::types::{ScopeId, ScopeRef};

/// Compact allow/deny answer for one operation over many scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionObject {
	pub operation: &'static str,
	pub default: bool,
	pub exceptions: BTreeSet<ScopeId>,
	/// Ids whose decision was resolved; `default` and `exceptions` only apply to these.
	pub resolved: BTreeSet<ScopeId>,
	/// Decision for ids outside `resolved`.
	pub baseline: bool,
}

impl PermissionObject {
	pub fn new(operation: &'static str, default: bool, baseline: bool) -> Self {
		Self {
			operation,
			default,
			exceptions: BTreeSet::new(),
			resolved: BTreeSet::new(),
			baseline,
		}
	}

	/// Records the resolved decision for `id`.
	pub fn record(&mut self, id: ScopeId, allowed: bool) {
		self.resolved.insert(id);
		if allowed == self.default {
			self.exceptions.remove(&id);
		} else {
			self.exceptions.insert(id);
		}
	}

	pub fn is_allowed(&self, id: ScopeId) -> bool {
		if self.resolved.contains(&id) {
			self.default != self.exceptions.contains(&id)
		} else {
			self.baseline
		}
	}
}

/// Builds a [`PermissionObject`] for one subject and operation.
pub struct BulkPermissionBuilder<'a, T: ScopeTree + ?Sized> {
	catalog: &'a RoleCatalog,
	tree: &'a T,
	operation: Operation,
	assignments: AssignmentIndex,
	nearest: HashMap<ScopeRef, Option<RoleUid>>,
	baseline: bool,
	object: PermissionObject,
}

impl<'a, T: ScopeTree + ?Sized> BulkPermissionBuilder<'a, T> {
	/// Computes the default and seeds exceptions from `assignments`.
	pub fn new(
		catalog: &'a RoleCatalog,
		tree: &'a T,
		operation: Operation,
		assignments: AssignmentIndex,
	) -> Result<Self> {
		let baseline = catalog.baseline().allows(&operation);
		let default = coarsest_decision(catalog, &operation, &assignments)?.unwrap_or(baseline);

		let mut object = PermissionObject::new(operation.id, default, baseline);
		for (scope, role) in assignments.iter() {
			if scope.scope_type == operation.scope_type {
				object.record(scope.id, catalog.default_decision(*role, &operation)?);
			}
		}

		tracing::trace!(
			operation = operation.id,
			default,
			assignments = assignments.len(),
			seeded = object.resolved.len(),
			"bulk permission builder initialised"
		);
		Ok(Self {
			catalog,
			tree,
			operation,
			assignments,
			nearest: HashMap::new(),
			baseline,
			object,
		})
	}

	pub fn operation(&self) -> &Operation {
		&self.operation
	}

	/// Resolves every candidate and records those that differ from the default.
	///
	/// # Errors
	///
	/// [`RbacError::OperationScopeMismatch`] if a candidate is not of the
	/// operation's scope type, [`RbacError::InvalidScope`] if its chain is broken.
	pub fn expand<'c, I>(&mut self, candidates: I) -> Result<()>
	where
		I: IntoIterator<Item = &'c ScopeRef>,
	{
		for candidate in candidates {
			validate_operation_scope(&self.operation, candidate)?;
			let allowed = match self.nearest_role(candidate)? {
				Some(role) => self.catalog.default_decision(role, &self.operation)?,
				None => self.baseline,
			};
			self.object.record(candidate.id, allowed);
		}
		Ok(())
	}

	pub fn permission_object(&self) -> &PermissionObject {
		&self.object
	}

	pub fn into_permission_object(self) -> PermissionObject {
		self.object
	}

	/// Role of the nearest assignment in the chain of `scope`, memoised per scope.
	fn nearest_role(&mut self, scope: &ScopeRef) -> Result<Option<RoleUid>> {
		let mut path = Vec::new();
		let mut inherited = None;
		let mut current = Some(*scope);

		while let Some(s) = current {
			if let Some(known) = self.nearest.get(&s) {
				inherited = *known;
				break;
			}
			if path.len() == MAX_SCOPE_DEPTH {
				return Err(RbacError::invalid_scope(
					*scope,
					format!("deeper than {MAX_SCOPE_DEPTH} scopes"),
				));
			}
			path.push(s);
			current = checked_parent(self.tree, &s).map_err(|e| blame(e, scope))?;
		}

		for s in path.into_iter().rev() {
			if let Some(role) = self.assignments.get(&s) {
				inherited = Some(role);
			}
			self.nearest.insert(s, inherited);
		}
		Ok(inherited)
	}
}

/// Decision of the root-most assignments that can be ancestors of the
/// operation's targets. `None` when there are none or they disagree.
fn coarsest_decision(
	catalog: &RoleCatalog,
	operation: &Operation,
	assignments: &AssignmentIndex,
) -> Result<Option<bool>> {
	let relevant: Vec<_> = assignments
		.iter()
		.filter(|(scope, _)| scope.scope_type.is_ancestor_or_self_of(operation.scope_type))
		.collect();
	let Some(min_depth) = relevant.iter().map(|(scope, _)| scope.scope_type.depth()).min() else {
		return Ok(None);
	};

	let mut decision = None;
	for (_, role) in relevant
		.iter()
		.filter(|(scope, _)| scope.scope_type.depth() == min_depth)
	{
		let allowed = catalog.default_decision(**role, operation)?;
		match decision {
			None => decision = Some(allowed),
			Some(previous) if previous != allowed => return Ok(None),
			Some(_) => {}
		}
	}
	Ok(decision)
}

/// Builds and expands a permission object over `candidates` in one call.
pub fn build_permission_object<'c, T, I>(
	catalog: &RoleCatalog,
	tree: &T,
	operation: Operation,
	assignments: AssignmentIndex,
	candidates: I,
) -> Result<PermissionObject>
where
	T: ScopeTree + ?Sized,
	I: IntoIterator<Item = &'c ScopeRef>,
{
	let mut builder = BulkPermissionBuilder::new(catalog, tree, operation, assignments)?;
	builder.expand(candidates)?;
	Ok(builder.into_permission_object())
}
