// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for role-based access control.
//!
//! - **ID newtypes**: [`UserId`], [`TeamId`] and [`ScopeId`] wrap UUIDs so that
//!   subjects and scopes cannot be mixed up
//! - **Subjects**: [`Subject`] is the key role assignments are stored under,
//!   either a single user or a team of users
//! - **Scopes**: [`ScopeType`] and [`ScopeRef`] address a node in the tree of
//!   protectable objects without knowing anything about the object itself
//! - **Assignments**: [`RoleAssignment`] grants a role to a subject at a scope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::RbacError;
use crate::role::RoleUid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}

		impl std::str::FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Ok(Self(Uuid::parse_str(s)?))
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(TeamId, "Unique identifier for a team.");
define_id_type!(ScopeId, "Unique identifier for a protectable object.");

// =============================================================================
// Subjects
// =============================================================================

/// The actor or actor-group a role is granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Subject {
	User(UserId),
	Team(TeamId),
}

impl Subject {
	/// Storage discriminator for the subject kind.
	pub fn kind(&self) -> &'static str {
		match self {
			Subject::User(_) => "user",
			Subject::Team(_) => "team",
		}
	}

	pub fn id(&self) -> Uuid {
		match self {
			Subject::User(id) => id.into_inner(),
			Subject::Team(id) => id.into_inner(),
		}
	}

	/// Rebuild a subject from its stored kind and id.
	pub fn from_parts(kind: &str, id: Uuid) -> Result<Self, RbacError> {
		match kind {
			"user" => Ok(Subject::User(UserId::new(id))),
			"team" => Ok(Subject::Team(TeamId::new(id))),
			_ => Err(RbacError::UnknownSubjectType(kind.to_string())),
		}
	}
}

impl fmt::Display for Subject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.kind(), self.id())
	}
}

impl From<UserId> for Subject {
	fn from(id: UserId) -> Self {
		Subject::User(id)
	}
}

impl From<TeamId> for Subject {
	fn from(id: TeamId) -> Self {
		Subject::Team(id)
	}
}

// =============================================================================
// Scopes
// =============================================================================

/// The kinds of objects that can carry role assignments and be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
	Workspace,
	Database,
	Table,
	View,
	Row,
}

impl ScopeType {
	/// Returns all scope types, root first.
	pub fn all() -> &'static [ScopeType] {
		&[
			ScopeType::Workspace,
			ScopeType::Database,
			ScopeType::Table,
			ScopeType::View,
			ScopeType::Row,
		]
	}

	/// The type every scope of this type must have as its parent.
	pub fn parent_type(&self) -> Option<ScopeType> {
		match self {
			ScopeType::Workspace => None,
			ScopeType::Database => Some(ScopeType::Workspace),
			ScopeType::Table => Some(ScopeType::Database),
			ScopeType::View | ScopeType::Row => Some(ScopeType::Table),
		}
	}

	/// Distance from the root of the tree; workspaces are at depth zero.
	pub fn depth(&self) -> usize {
		match self.parent_type() {
			Some(parent) => parent.depth() + 1,
			None => 0,
		}
	}

	/// Returns true if scopes of this type can appear in the ancestor chain of `other`.
	pub fn is_ancestor_or_self_of(&self, other: ScopeType) -> bool {
		let mut current = Some(other);
		while let Some(t) = current {
			if t == *self {
				return true;
			}
			current = t.parent_type();
		}
		false
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			ScopeType::Workspace => "workspace",
			ScopeType::Database => "database",
			ScopeType::Table => "table",
			ScopeType::View => "view",
			ScopeType::Row => "row",
		}
	}
}

impl fmt::Display for ScopeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for ScopeType {
	type Err = RbacError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"workspace" => Ok(ScopeType::Workspace),
			"database" => Ok(ScopeType::Database),
			"table" => Ok(ScopeType::Table),
			"view" => Ok(ScopeType::View),
			"row" => Ok(ScopeType::Row),
			_ => Err(RbacError::UnknownScopeType(s.to_string())),
		}
	}
}

/// Handle to a node in the scope tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeRef {
	pub scope_type: ScopeType,
	pub id: ScopeId,
}

impl ScopeRef {
	pub fn new(scope_type: ScopeType, id: ScopeId) -> Self {
		Self { scope_type, id }
	}

	pub fn workspace(id: ScopeId) -> Self {
		Self::new(ScopeType::Workspace, id)
	}

	pub fn database(id: ScopeId) -> Self {
		Self::new(ScopeType::Database, id)
	}

	pub fn table(id: ScopeId) -> Self {
		Self::new(ScopeType::Table, id)
	}

	pub fn view(id: ScopeId) -> Self {
		Self::new(ScopeType::View, id)
	}

	pub fn row(id: ScopeId) -> Self {
		Self::new(ScopeType::Row, id)
	}
}

impl fmt::Display for ScopeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.scope_type, self.id)
	}
}

// =============================================================================
// Role Assignments
// =============================================================================

/// A grant of a role to a subject at a specific scope.
///
/// At most one assignment exists per `(subject, scope)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
	pub subject: Subject,
	pub scope: ScopeRef,
	pub role: RoleUid,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl RoleAssignment {
	pub fn new(subject: Subject, scope: ScopeRef, role: RoleUid) -> Self {
		let now = Utc::now();
		Self {
			subject,
			scope,
			role,
			created_at: now,
			updated_at: now,
		}
	}
}
