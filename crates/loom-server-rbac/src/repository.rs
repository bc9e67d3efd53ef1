// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role assignment storage.
//!
//! The store only knows about `(subject, scope, role)` rows. Ancestor walks
//! happen in the application layer: callers pass the already computed
//! [`ScopeChain`] to [`RoleAssignmentStore::find_nearest`], which loads every
//! assignment on the chain in one query and keeps the most specific.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loom_rbac_core::{RoleAssignment, RoleUid, ScopeChain, ScopeRef, Subject};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{RbacServerError, Result};

/// Persistence of role assignments, at most one per `(subject, scope)`.
#[async_trait]
pub trait RoleAssignmentStore: Send + Sync {
	/// Grants `role` to `subject` at `scope`, replacing any existing grant there.
	async fn assign(&self, subject: Subject, scope: ScopeRef, role: RoleUid)
		-> Result<RoleAssignment>;

	/// Removes the grant at exactly `scope`. Returns whether one existed.
	async fn revoke(&self, subject: Subject, scope: ScopeRef) -> Result<bool>;

	async fn get_assignment(
		&self,
		subject: Subject,
		scope: ScopeRef,
	) -> Result<Option<RoleAssignment>>;

	/// The assignment at the most specific scope of `chain`, if any.
	async fn find_nearest(
		&self,
		subject: Subject,
		chain: &ScopeChain,
	) -> Result<Option<RoleAssignment>>;

	async fn list_assignments_for_subject(&self, subject: Subject) -> Result<Vec<RoleAssignment>>;

	async fn list_assignments_for_scope(&self, scope: ScopeRef) -> Result<Vec<RoleAssignment>>;

	/// Removes every grant made at exactly `scope`, for when the object itself
	/// is deleted. Grants at its ancestors are untouched.
	async fn revoke_all_for_scope(&self, scope: ScopeRef) -> Result<u64>;
}

/// Picks the assignment closest to the start of `chain`.
pub(crate) fn nearest_in_chain(
	chain: &ScopeChain,
	assignments: impl IntoIterator<Item = RoleAssignment>,
) -> Option<RoleAssignment> {
	assignments
		.into_iter()
		.filter_map(|a| chain.position(&a.scope).map(|pos| (pos, a)))
		.min_by_key(|(pos, _)| *pos)
		.map(|(_, a)| a)
}

/// SQLite implementation of the role assignment store.
#[derive(Clone)]
pub struct SqliteRoleAssignmentRepository {
	pool: SqlitePool,
}

impl SqliteRoleAssignmentRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

const ASSIGNMENT_COLUMNS: &str =
	"subject_type, subject_id, scope_type, scope_id, role, created_at, updated_at";

#[async_trait]
impl RoleAssignmentStore for SqliteRoleAssignmentRepository {
	#[instrument(skip(self), fields(subject = %subject, scope = %scope, role = %role))]
	async fn assign(
		&self,
		subject: Subject,
		scope: ScopeRef,
		role: RoleUid,
	) -> Result<RoleAssignment> {
		let now = Utc::now().to_rfc3339();
		let row = sqlx::query_as::<_, AssignmentRow>(
			r#"
			INSERT INTO role_assignments (subject_type, subject_id, scope_type, scope_id, role, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT (subject_type, subject_id, scope_id) DO UPDATE SET
				scope_type = excluded.scope_type,
				role = excluded.role,
				updated_at = excluded.updated_at
			RETURNING subject_type, subject_id, scope_type, scope_id, role, created_at, updated_at
			"#,
		)
		.bind(subject.kind())
		.bind(subject.id().to_string())
		.bind(scope.scope_type.as_str())
		.bind(scope.id.to_string())
		.bind(role.as_str())
		.bind(&now)
		.bind(&now)
		.fetch_one(&self.pool)
		.await?;

		tracing::debug!(subject = %subject, scope = %scope, role = %role, "role assigned");
		row.try_into()
	}

	#[instrument(skip(self), fields(subject = %subject, scope = %scope))]
	async fn revoke(&self, subject: Subject, scope: ScopeRef) -> Result<bool> {
		let result = sqlx::query(
			r#"
			DELETE FROM role_assignments
			WHERE subject_type = ? AND subject_id = ? AND scope_id = ?
			"#,
		)
		.bind(subject.kind())
		.bind(subject.id().to_string())
		.bind(scope.id.to_string())
		.execute(&self.pool)
		.await?;

		let removed = result.rows_affected() > 0;
		tracing::debug!(subject = %subject, scope = %scope, removed, "role revoked");
		Ok(removed)
	}

	#[instrument(skip(self), fields(subject = %subject, scope = %scope))]
	async fn get_assignment(
		&self,
		subject: Subject,
		scope: ScopeRef,
	) -> Result<Option<RoleAssignment>> {
		let row = sqlx::query_as::<_, AssignmentRow>(&format!(
			"SELECT {ASSIGNMENT_COLUMNS} FROM role_assignments \
			 WHERE subject_type = ? AND subject_id = ? AND scope_id = ?"
		))
		.bind(subject.kind())
		.bind(subject.id().to_string())
		.bind(scope.id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self, chain), fields(subject = %subject, scope = %chain.scope()))]
	async fn find_nearest(
		&self,
		subject: Subject,
		chain: &ScopeChain,
	) -> Result<Option<RoleAssignment>> {
		let mut query = QueryBuilder::<Sqlite>::new(format!(
			"SELECT {ASSIGNMENT_COLUMNS} FROM role_assignments WHERE subject_type = "
		));
		query
			.push_bind(subject.kind())
			.push(" AND subject_id = ")
			.push_bind(subject.id().to_string())
			.push(" AND scope_id IN (");
		let mut ids = query.separated(", ");
		for scope in chain {
			ids.push_bind(scope.id.to_string());
		}
		ids.push_unseparated(")");

		let rows = query
			.build_query_as::<AssignmentRow>()
			.fetch_all(&self.pool)
			.await?;
		let assignments = rows
			.into_iter()
			.map(RoleAssignment::try_from)
			.collect::<Result<Vec<_>>>()?;

		Ok(nearest_in_chain(chain, assignments))
	}

	#[instrument(skip(self), fields(subject = %subject))]
	async fn list_assignments_for_subject(&self, subject: Subject) -> Result<Vec<RoleAssignment>> {
		let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
			"SELECT {ASSIGNMENT_COLUMNS} FROM role_assignments \
			 WHERE subject_type = ? AND subject_id = ? \
			 ORDER BY created_at ASC, scope_id ASC"
		))
		.bind(subject.kind())
		.bind(subject.id().to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self), fields(scope = %scope))]
	async fn list_assignments_for_scope(&self, scope: ScopeRef) -> Result<Vec<RoleAssignment>> {
		let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
			"SELECT {ASSIGNMENT_COLUMNS} FROM role_assignments \
			 WHERE scope_id = ? \
			 ORDER BY created_at ASC, subject_id ASC"
		))
		.bind(scope.id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self), fields(scope = %scope))]
	async fn revoke_all_for_scope(&self, scope: ScopeRef) -> Result<u64> {
		let result = sqlx::query("DELETE FROM role_assignments WHERE scope_id = ?")
			.bind(scope.id.to_string())
			.execute(&self.pool)
			.await?;

		tracing::debug!(scope = %scope, removed = result.rows_affected(), "scope assignments revoked");
		Ok(result.rows_affected())
	}
}

// Database row types for sqlx

#[derive(sqlx::FromRow)]
struct AssignmentRow {
	subject_type: String,
	subject_id: String,
	scope_type: String,
	scope_id: String,
	role: String,
	created_at: String,
	updated_at: String,
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|_| RbacServerError::InvalidData(format!("invalid {field}: {value}")))
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
	Uuid::parse_str(value)
		.map_err(|_| RbacServerError::InvalidData(format!("invalid {field}: {value}")))
}

impl TryFrom<AssignmentRow> for RoleAssignment {
	type Error = RbacServerError;

	fn try_from(row: AssignmentRow) -> Result<Self> {
		let invalid = |e: loom_rbac_core::RbacError| {
			tracing::warn!(error = %e, "undecodable role assignment row");
			RbacServerError::InvalidData(e.to_string())
		};

		let subject = Subject::from_parts(&row.subject_type, parse_uuid("subject_id", &row.subject_id)?)
			.map_err(invalid)?;
		let scope = ScopeRef::new(
			row.scope_type.parse().map_err(invalid)?,
			parse_uuid("scope_id", &row.scope_id)?.into(),
		);
		let role = row.role.parse().map_err(invalid)?;

		Ok(RoleAssignment {
			subject,
			scope,
			role,
			created_at: parse_timestamp("created_at", &row.created_at)?,
			updated_at: parse_timestamp("updated_at", &row.updated_at)?,
		})
	}
}
