// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Connection pool behind [`crate::SqliteRoleAssignmentRepository`].

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RbacServerError, Result};

/// How long an `assign` or `revoke` waits for another writer's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the role assignment database named by `rbac.database_url`.
///
/// The file is created when missing. Permission checks read through WAL while
/// an assignment is being written; concurrent writers queue for up to
/// [`BUSY_TIMEOUT`]. The schema is not installed here, see
/// [`crate::install_schema`].
///
/// # Errors
/// [`RbacServerError::InvalidConfig`] for `database_url` if the URL does not
/// parse, [`RbacServerError::Database`] if the database cannot be opened.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| RbacServerError::InvalidConfig {
			key: "rbac.database_url".to_string(),
			message: e.to_string(),
		})?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.busy_timeout(BUSY_TIMEOUT)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("role assignment pool opened");
	Ok(pool)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::repository::{RoleAssignmentStore, SqliteRoleAssignmentRepository};
	use crate::schema::install_schema;
	use loom_rbac_core::{RoleUid, ScopeId, ScopeRef, Subject, UserId};

	#[tokio::test]
	async fn reopened_database_keeps_assignments() {
		let dir = tempfile::tempdir().unwrap();
		let url = format!("sqlite:{}", dir.path().join("rbac.db").display());
		let subject = Subject::User(UserId::generate());
		let table = ScopeRef::table(ScopeId::generate());

		let pool = create_pool(&url).await.unwrap();
		install_schema(&pool).await.unwrap();
		SqliteRoleAssignmentRepository::new(pool.clone())
			.assign(subject, table, RoleUid::Editor)
			.await
			.unwrap();
		pool.close().await;

		let pool = create_pool(&url).await.unwrap();
		install_schema(&pool).await.unwrap();
		let found = SqliteRoleAssignmentRepository::new(pool)
			.get_assignment(subject, table)
			.await
			.unwrap();
		assert_eq!(found.map(|a| a.role), Some(RoleUid::Editor));
	}

	#[tokio::test]
	async fn malformed_url_names_the_config_key() {
		let err = create_pool("sqlite:rbac.db?colour=blue").await.unwrap_err();
		match err {
			RbacServerError::InvalidConfig { key, .. } => assert_eq!(key, "rbac.database_url"),
			other => panic!("unexpected error: {other}"),
		}
	}
}
