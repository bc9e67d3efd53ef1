// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for role-based access control.
//!
//! Only [`RbacError::PermissionDenied`] is an expected outcome of a check. Every
//! other variant is a configuration defect, a programming error in the caller,
//! or a data integrity problem in the scope tree.

use thiserror::Error;

use crate::types::{ScopeRef, ScopeType, Subject};

/// Result type for RBAC operations.
pub type Result<T> = std::result::Result<T, RbacError>;

/// Errors that can occur while building the catalog or resolving permissions.
#[derive(Debug, Error)]
pub enum RbacError {
	/// The subject's effective role does not grant the operation at the scope.
	#[error("permission denied: {subject} may not perform {operation} on {scope}")]
	PermissionDenied {
		subject: Subject,
		operation: &'static str,
		scope: ScopeRef,
	},

	#[error("role not found: {0}")]
	RoleNotFound(String),

	#[error("operation not found: {0}")]
	OperationNotFound(String),

	#[error("operation registered twice: {0}")]
	DuplicateOperation(String),

	/// A role declaration leaves an operation unspecified.
	#[error("role {role} does not declare operation {operation}")]
	IncompleteRole { role: String, operation: String },

	/// The context passed to a check is not the kind of scope the operation targets.
	#[error("operation {operation} applies to {expected} scopes, got {actual}")]
	OperationScopeMismatch {
		operation: &'static str,
		expected: ScopeType,
		actual: ScopeType,
	},

	/// The scope tree is detached, cyclic or malformed at this scope.
	#[error("invalid scope {scope}: {reason}")]
	InvalidScope { scope: ScopeRef, reason: String },

	#[error("unknown scope type: {0}")]
	UnknownScopeType(String),

	#[error("unknown subject type: {0}")]
	UnknownSubjectType(String),

	#[error("invalid role table: {0}")]
	CatalogParse(#[from] toml::de::Error),
}

impl RbacError {
	/// Returns true for the one variant that is a normal authorization outcome.
	pub fn is_permission_denied(&self) -> bool {
		matches!(self, RbacError::PermissionDenied { .. })
	}

	pub(crate) fn invalid_scope(scope: ScopeRef, reason: impl Into<String>) -> Self {
		RbacError::InvalidScope {
			scope,
			reason: reason.into(),
		}
	}
}
