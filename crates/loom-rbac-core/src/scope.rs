// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scope hierarchy resolution.
//!
//! The owning application supplies parent links through the [`ScopeTree`]
//! trait. [`ancestor_chain`] turns a scope into its ordered chain of ancestors,
//! most specific first, and rejects anything that is not a well-formed path to
//! a workspace root.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{RbacError, Result};
use crate::types::{ScopeId, ScopeRef, ScopeType};

/// Upper bound on the number of scopes in any ancestor chain.
pub const MAX_SCOPE_DEPTH: usize = 8;

/// Source of parent links for scopes.
pub trait ScopeTree: Send + Sync {
	/// Returns the immediate parent of `scope`, or `None` if it is a root.
	///
	/// Implementations return [`RbacError::InvalidScope`] for scopes they do not
	/// know about.
	fn parent(&self, scope: &ScopeRef) -> Result<Option<ScopeRef>>;
}

impl<T: ScopeTree + ?Sized> ScopeTree for Arc<T> {
	fn parent(&self, scope: &ScopeRef) -> Result<Option<ScopeRef>> {
		(**self).parent(scope)
	}
}

impl<T: ScopeTree + ?Sized> ScopeTree for &T {
	fn parent(&self, scope: &ScopeRef) -> Result<Option<ScopeRef>> {
		(**self).parent(scope)
	}
}

/// Looks up the parent of `scope` and checks it has the type the hierarchy requires.
pub(crate) fn checked_parent<T: ScopeTree + ?Sized>(
	tree: &T,
	scope: &ScopeRef,
) -> Result<Option<ScopeRef>> {
	let parent = tree.parent(scope)?;
	match (scope.scope_type.parent_type(), parent) {
		(None, None) => Ok(None),
		(None, Some(parent)) => Err(RbacError::invalid_scope(
			*scope,
			format!("root scope reports parent {parent}"),
		)),
		(Some(expected), None) => Err(RbacError::invalid_scope(
			*scope,
			format!("detached, expected a {expected} parent"),
		)),
		(Some(expected), Some(parent)) if parent.scope_type != expected => {
			Err(RbacError::invalid_scope(
				*scope,
				format!("parent {parent} is not a {expected}"),
			))
		}
		(Some(_), Some(parent)) => Ok(Some(parent)),
	}
}

/// Ordered ancestors of a scope, starting at the scope itself and ending at the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeChain {
	scopes: Vec<ScopeRef>,
}

impl ScopeChain {
	/// The scope the chain was computed for.
	pub fn scope(&self) -> ScopeRef {
		self.scopes[0]
	}

	pub fn root(&self) -> ScopeRef {
		self.scopes[self.scopes.len() - 1]
	}

	pub fn iter(&self) -> impl Iterator<Item = &ScopeRef> {
		self.scopes.iter()
	}

	pub fn as_slice(&self) -> &[ScopeRef] {
		&self.scopes
	}

	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Always false; a chain holds at least the scope itself.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Index of `scope` in the chain, zero being the most specific.
	pub fn position(&self, scope: &ScopeRef) -> Option<usize> {
		self.scopes.iter().position(|s| s == scope)
	}

	pub fn contains(&self, scope: &ScopeRef) -> bool {
		self.position(scope).is_some()
	}
}

impl<'a> IntoIterator for &'a ScopeChain {
	type Item = &'a ScopeRef;
	type IntoIter = std::slice::Iter<'a, ScopeRef>;

	fn into_iter(self) -> Self::IntoIter {
		self.scopes.iter()
	}
}

/// Rewrites an [`RbacError::InvalidScope`] raised for an ancestor so that it
/// names `requested`, keeping the broken link in the reason.
pub(crate) fn blame(err: RbacError, requested: &ScopeRef) -> RbacError {
	match err {
		RbacError::InvalidScope { scope, reason } if scope != *requested => {
			RbacError::invalid_scope(*requested, format!("ancestor {scope}: {reason}"))
		}
		other => other,
	}
}

/// Computes the ancestor chain of `scope`.
///
/// # Errors
///
/// Returns [`RbacError::InvalidScope`] if the scope is unknown to the tree, a
/// parent link is missing or points at the wrong kind of scope, the chain
/// revisits a scope, or it exceeds [`MAX_SCOPE_DEPTH`].
pub fn ancestor_chain<T: ScopeTree + ?Sized>(tree: &T, scope: &ScopeRef) -> Result<ScopeChain> {
	let mut scopes = vec![*scope];
	let mut seen = HashSet::from([*scope]);
	let mut current = *scope;

	while let Some(parent) = checked_parent(tree, &current).map_err(|e| blame(e, scope))? {
		if !seen.insert(parent) {
			return Err(RbacError::invalid_scope(
				*scope,
				format!("cycle through {parent}"),
			));
		}
		if scopes.len() == MAX_SCOPE_DEPTH {
			return Err(RbacError::invalid_scope(
				*scope,
				format!("deeper than {MAX_SCOPE_DEPTH} scopes"),
			));
		}
		scopes.push(parent);
		current = parent;
	}

	Ok(ScopeChain { scopes })
}

#[derive(Debug, Clone, Copy)]
struct ScopeNode {
	scope_type: ScopeType,
	parent: Option<ScopeId>,
}

/// In-memory scope tree.
///
/// Suitable for applications that keep the hierarchy in memory and for tests.
/// Insertion enforces the parent type rules, so a well-built forest never
/// yields an invalid chain unless a node is removed from under its children.
#[derive(Debug, Clone, Default)]
pub struct ScopeForest {
	nodes: HashMap<ScopeId, ScopeNode>,
}

impl ScopeForest {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a workspace root.
	pub fn insert_workspace(&mut self, id: ScopeId) -> ScopeRef {
		self.nodes.insert(
			id,
			ScopeNode {
				scope_type: ScopeType::Workspace,
				parent: None,
			},
		);
		ScopeRef::workspace(id)
	}

	/// Adds `scope` below `parent`, replacing any node with the same id.
	pub fn insert(&mut self, scope: ScopeRef, parent: ScopeRef) -> Result<ScopeRef> {
		match scope.scope_type.parent_type() {
			Some(expected) if expected == parent.scope_type => {}
			Some(expected) => {
				return Err(RbacError::invalid_scope(
					scope,
					format!("parent {parent} is not a {expected}"),
				));
			}
			None => {
				return Err(RbacError::invalid_scope(
					scope,
					"workspaces cannot have a parent",
				));
			}
		}
		if self.get(parent.id) != Some(parent) {
			return Err(RbacError::invalid_scope(
				scope,
				format!("parent {parent} is not in the tree"),
			));
		}

		self.nodes.insert(
			scope.id,
			ScopeNode {
				scope_type: scope.scope_type,
				parent: Some(parent.id),
			},
		);
		Ok(scope)
	}

	/// Removes a single node. Its children stay in the forest and become detached.
	pub fn remove(&mut self, scope: &ScopeRef) -> bool {
		self.nodes.remove(&scope.id).is_some()
	}

	pub fn get(&self, id: ScopeId) -> Option<ScopeRef> {
		self
			.nodes
			.get(&id)
			.map(|node| ScopeRef::new(node.scope_type, id))
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

impl ScopeTree for ScopeForest {
	fn parent(&self, scope: &ScopeRef) -> Result<Option<ScopeRef>> {
		let node = self
			.nodes
			.get(&scope.id)
			.ok_or_else(|| RbacError::invalid_scope(*scope, "unknown scope"))?;
		if node.scope_type != scope.scope_type {
			return Err(RbacError::invalid_scope(
				*scope,
				format!("stored as a {}", node.scope_type),
			));
		}

		match node.parent {
			None => Ok(None),
			Some(parent_id) => self.get(parent_id).map(Some).ok_or_else(|| {
				RbacError::invalid_scope(*scope, format!("parent {parent_id} is missing"))
			}),
		}
	}
}
