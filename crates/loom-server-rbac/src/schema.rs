// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role assignment schema.
//!
//! One row per `(subject, scope)`. Scope ids are globally unique, so the
//! primary key does not need the scope type; it is stored to rebuild
//! [`loom_rbac_core::ScopeRef`] values without consulting the scope tree.

use sqlx::sqlite::SqlitePool;

use crate::error::Result;

const CREATE_ROLE_ASSIGNMENTS: &str = r#"
	CREATE TABLE IF NOT EXISTS role_assignments (
		subject_type TEXT NOT NULL CHECK (subject_type IN ('user', 'team')),
		subject_id TEXT NOT NULL,
		scope_type TEXT NOT NULL CHECK (scope_type IN ('workspace', 'database', 'table', 'view', 'row')),
		scope_id TEXT NOT NULL,
		role TEXT NOT NULL,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		PRIMARY KEY (subject_type, subject_id, scope_id)
	)
"#;

const CREATE_SCOPE_INDEX: &str =
	"CREATE INDEX IF NOT EXISTS idx_role_assignments_scope ON role_assignments(scope_id)";

/// Creates the role assignment table and its indices if they do not exist.
#[tracing::instrument(skip(pool))]
pub async fn install_schema(pool: &SqlitePool) -> Result<()> {
	sqlx::query(CREATE_ROLE_ASSIGNMENTS).execute(pool).await?;
	sqlx::query(CREATE_SCOPE_INDEX).execute(pool).await?;
	tracing::debug!("role assignment schema installed");
	Ok(())
}
