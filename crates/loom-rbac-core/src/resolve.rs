// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Nearest-scope-wins permission resolution.
//!
//! Resolution is a pure function of a subject's assignments, the scope tree and
//! the role catalog:
//!
//! 1. The operation's scope type must match the context scope
//! 2. The context's ancestor chain is computed
//! 3. The assignment at the most specific scope in the chain decides the role,
//!    or the baseline role applies if there is none
//! 4. The role's static default for the operation is the answer
//!
//! Loading the assignments is the caller's job; nothing here does I/O.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::{RbacError, Result};
use crate::operation::Operation;
use crate::role::{RoleCatalog, RoleUid};
use crate::scope::{ancestor_chain, ScopeChain, ScopeTree};
use crate::types::{RoleAssignment, ScopeRef, Subject};

/// One subject's role assignments, keyed by scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentIndex {
	roles: HashMap<ScopeRef, RoleUid>,
}

impl AssignmentIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records `role` at `scope`, replacing any earlier entry.
	pub fn insert(&mut self, scope: ScopeRef, role: RoleUid) -> Option<RoleUid> {
		self.roles.insert(scope, role)
	}

	pub fn get(&self, scope: &ScopeRef) -> Option<RoleUid> {
		self.roles.get(scope).copied()
	}

	/// The assignment at the most specific scope of `chain`, if any.
	pub fn nearest(&self, chain: &ScopeChain) -> Option<(ScopeRef, RoleUid)> {
		chain
			.iter()
			.find_map(|scope| self.get(scope).map(|role| (*scope, role)))
	}

	pub fn iter(&self) -> impl Iterator<Item = (&ScopeRef, &RoleUid)> {
		self.roles.iter()
	}

	pub fn len(&self) -> usize {
		self.roles.len()
	}

	pub fn is_empty(&self) -> bool {
		self.roles.is_empty()
	}
}

impl FromIterator<(ScopeRef, RoleUid)> for AssignmentIndex {
	fn from_iter<I: IntoIterator<Item = (ScopeRef, RoleUid)>>(iter: I) -> Self {
		Self {
			roles: iter.into_iter().collect(),
		}
	}
}

impl<'a> FromIterator<&'a RoleAssignment> for AssignmentIndex {
	fn from_iter<I: IntoIterator<Item = &'a RoleAssignment>>(iter: I) -> Self {
		iter.into_iter().map(|a| (a.scope, a.role)).collect()
	}
}

/// Outcome of a single permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedDecision {
	pub operation: &'static str,
	pub scope: ScopeRef,
	pub allowed: bool,
	pub role: RoleUid,
	/// The scope whose assignment decided, or the chain root for the baseline.
	pub decisive_scope: ScopeRef,
	pub from_baseline: bool,
}

impl ResolvedDecision {
	/// Turns a denial into [`RbacError::PermissionDenied`] for `subject`.
	pub fn ensure_allowed(self, subject: Subject) -> Result<Self> {
		if self.allowed {
			Ok(self)
		} else {
			Err(RbacError::PermissionDenied {
				subject,
				operation: self.operation,
				scope: self.scope,
			})
		}
	}
}

/// Fails with [`RbacError::OperationScopeMismatch`] unless `scope` is the kind
/// of object `operation` is checked against.
pub fn validate_operation_scope(operation: &Operation, scope: &ScopeRef) -> Result<()> {
	if operation.scope_type != scope.scope_type {
		return Err(RbacError::OperationScopeMismatch {
			operation: operation.id,
			expected: operation.scope_type,
			actual: scope.scope_type,
		});
	}
	Ok(())
}

/// Applies the catalog to an already located assignment.
pub fn decide(
	catalog: &RoleCatalog,
	operation: &Operation,
	chain: &ScopeChain,
	nearest: Option<(ScopeRef, RoleUid)>,
) -> Result<ResolvedDecision> {
	let (decisive_scope, role, from_baseline) = match nearest {
		Some((scope, role)) => (scope, role, false),
		None => (chain.root(), catalog.baseline().uid, true),
	};
	let allowed = catalog.default_decision(role, operation)?;

	Ok(ResolvedDecision {
		operation: operation.id,
		scope: chain.scope(),
		allowed,
		role,
		decisive_scope,
		from_baseline,
	})
}

/// Resolves `operation` on `scope` for the subject whose assignments are `assignments`.
pub fn resolve<T: ScopeTree + ?Sized>(
	catalog: &RoleCatalog,
	tree: &T,
	assignments: &AssignmentIndex,
	operation: &Operation,
	scope: &ScopeRef,
) -> Result<ResolvedDecision> {
	validate_operation_scope(operation, scope)?;
	let chain = ancestor_chain(tree, scope)?;
	let decision = decide(catalog, operation, &chain, assignments.nearest(&chain))?;

	tracing::trace!(
		operation = operation.id,
		scope = %scope,
		role = %decision.role,
		decisive_scope = %decision.decisive_scope,
		allowed = decision.allowed,
		"permission resolved"
	);
	Ok(decision)
}
