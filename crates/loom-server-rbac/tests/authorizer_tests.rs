// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests for the authorizer against a SQLite database on disk.
//!
//! Tests cover:
//! - Nearest-scope-wins and sibling inheritance
//! - Baseline denial for subjects with no assignments
//! - Bulk filtering agreeing with single checks
//! - Assignment lifecycle (upsert, revoke, scope deletion)
//! - Configuration with a custom role table

use std::sync::Arc;

use loom_server_rbac::{
	ops, Authorizer, RbacConfig, RbacError, RbacServerError, RoleCatalog, RoleTable, RoleUid,
	ScopeForest, ScopeId, ScopeRef, Subject, TeamId, UserId,
};
use tempfile::{tempdir, TempDir};

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter("loom_server_rbac=debug,loom_rbac_core=trace")
		.with_test_writer()
		.try_init();
}

struct Workspace {
	workspace: ScopeRef,
	database: ScopeRef,
	table: ScopeRef,
	sibling: ScopeRef,
	rows: Vec<ScopeRef>,
	other_workspace: ScopeRef,
}

fn build_forest() -> (ScopeForest, Workspace) {
	let mut forest = ScopeForest::new();
	let workspace = forest.insert_workspace(ScopeId::generate());
	let database = forest
		.insert(ScopeRef::database(ScopeId::generate()), workspace)
		.unwrap();
	let table = forest
		.insert(ScopeRef::table(ScopeId::generate()), database)
		.unwrap();
	let sibling = forest
		.insert(ScopeRef::table(ScopeId::generate()), database)
		.unwrap();
	let mut rows = Vec::new();
	for parent in [table, sibling, table] {
		rows.push(
			forest
				.insert(ScopeRef::row(ScopeId::generate()), parent)
				.unwrap(),
		);
	}
	let other_workspace = forest.insert_workspace(ScopeId::generate());
	(
		forest,
		Workspace {
			workspace,
			database,
			table,
			sibling,
			rows,
			other_workspace,
		},
	)
}

/// Creates an authorizer with an isolated on-disk database.
async fn setup(config: Option<RbacConfig>) -> (Authorizer, Workspace, TempDir) {
	init_tracing();
	let dir = tempdir().unwrap();
	let db_path = dir.path().join("test_rbac.db");
	let mut config = config.unwrap_or_default();
	config.database_url = format!("sqlite:{}?mode=rwc", db_path.display());

	let (forest, scopes) = build_forest();
	let authorizer = Authorizer::from_config(&config, Arc::new(forest))
		.await
		.unwrap();
	(authorizer, scopes, dir)
}

// ============================================================================
// Single-object checks
// ============================================================================

#[tokio::test]
async fn test_builder_on_table_overrides_workspace_viewer() {
	let (authorizer, s, _dir) = setup(None).await;
	let a = Subject::User(UserId::generate());
	authorizer
		.assign(a, s.workspace, RoleUid::Viewer)
		.await
		.unwrap();
	authorizer.assign(a, s.table, RoleUid::Builder).await.unwrap();

	assert!(authorizer
		.check(a, &ops::UPDATE_TABLE, &s.table)
		.await
		.is_ok());

	let err = authorizer
		.check(a, &ops::UPDATE_TABLE, &s.sibling)
		.await
		.unwrap_err();
	assert!(err.is_permission_denied());
	match err {
		RbacServerError::Rbac(RbacError::PermissionDenied {
			subject,
			operation,
			scope,
		}) => {
			assert_eq!(subject, a);
			assert_eq!(operation, ops::UPDATE_TABLE.id);
			assert_eq!(scope, s.sibling);
		}
		other => panic!("unexpected error: {other}"),
	}

	assert!(authorizer
		.can(a, &ops::READ_TABLE, &s.sibling)
		.await
		.unwrap());
}

#[tokio::test]
async fn test_no_assignment_is_denied() {
	let (authorizer, s, _dir) = setup(None).await;
	let b = Subject::User(UserId::generate());

	let err = authorizer
		.check(b, &ops::READ_WORKSPACE, &s.other_workspace)
		.await
		.unwrap_err();
	assert!(err.is_permission_denied());

	let decision = authorizer
		.resolve(b, &ops::READ_WORKSPACE, &s.other_workspace)
		.await
		.unwrap();
	assert!(decision.from_baseline);
	assert_eq!(decision.role, RoleUid::NoAccess);
}

#[tokio::test]
async fn test_assignment_elsewhere_does_not_leak() {
	let (authorizer, s, _dir) = setup(None).await;
	let a = Subject::User(UserId::generate());
	authorizer
		.assign(a, s.workspace, RoleUid::Admin)
		.await
		.unwrap();

	assert!(!authorizer
		.can(a, &ops::READ_WORKSPACE, &s.other_workspace)
		.await
		.unwrap());
}

#[tokio::test]
async fn test_team_and_user_assignments_are_independent() {
	let (authorizer, s, _dir) = setup(None).await;
	let team = TeamId::generate();
	let user = UserId::generate();
	authorizer
		.assign(team.into(), s.database, RoleUid::Editor)
		.await
		.unwrap();

	assert!(authorizer
		.can(team.into(), &ops::UPDATE_ROW, &s.rows[0])
		.await
		.unwrap());
	assert!(!authorizer
		.can(user.into(), &ops::READ_ROW, &s.rows[0])
		.await
		.unwrap());
}

#[tokio::test]
async fn test_detached_scope_is_invalid_not_denied() {
	let (authorizer, _s, _dir) = setup(None).await;
	let a = Subject::User(UserId::generate());
	let detached = ScopeRef::table(ScopeId::generate());

	let err = authorizer
		.check(a, &ops::READ_TABLE, &detached)
		.await
		.unwrap_err();
	assert!(matches!(
		err,
		RbacServerError::Rbac(RbacError::InvalidScope { .. })
	));
}

// ============================================================================
// Bulk filtering
// ============================================================================

#[tokio::test]
async fn test_filter_matches_single_checks() {
	let (authorizer, s, _dir) = setup(None).await;
	let a = Subject::User(UserId::generate());
	authorizer
		.assign(a, s.workspace, RoleUid::Viewer)
		.await
		.unwrap();
	authorizer.assign(a, s.table, RoleUid::Builder).await.unwrap();

	let object = authorizer
		.permission_object(a, ops::UPDATE_TABLE, &[s.table, s.sibling])
		.await
		.unwrap();
	assert!(!object.default);
	assert_eq!(object.exceptions.len(), 1);
	assert!(object.exceptions.contains(&s.table.id));

	let kept = authorizer
		.filter(a, ops::UPDATE_TABLE, vec![s.table, s.sibling])
		.await
		.unwrap();
	assert_eq!(kept, vec![s.table]);

	// Rows under the builder table may be deleted, rows under the sibling may not.
	let kept = authorizer
		.filter(a, ops::DELETE_ROW, s.rows.clone())
		.await
		.unwrap();
	let mut expected = Vec::new();
	for row in &s.rows {
		if authorizer.can(a, &ops::DELETE_ROW, row).await.unwrap() {
			expected.push(*row);
		}
	}
	assert_eq!(kept, expected);
	assert_eq!(kept, vec![s.rows[0], s.rows[2]]);
}

#[tokio::test]
async fn test_bulk_builder_pages() {
	let (authorizer, s, _dir) = setup(None).await;
	let a = Subject::User(UserId::generate());
	authorizer
		.assign(a, s.sibling, RoleUid::Commenter)
		.await
		.unwrap();

	let mut builder = authorizer.bulk_builder(a, ops::COMMENT_ROW).await.unwrap();
	for page in s.rows.chunks(2) {
		builder.expand(page).unwrap();
	}
	let object = builder.into_permission_object();
	// The table grant is the coarsest one, so allowing is the default.
	assert!(object.default);
	assert!(object.is_allowed(s.rows[1].id));
	assert!(!object.is_allowed(s.rows[0].id));
	assert!(!object.is_allowed(s.rows[2].id));
}

#[tokio::test]
async fn test_permission_object_serializes() {
	let (authorizer, s, _dir) = setup(None).await;
	let a = Subject::User(UserId::generate());
	authorizer.assign(a, s.table, RoleUid::Viewer).await.unwrap();

	let object = authorizer
		.permission_object(a, ops::READ_TABLE, &[s.table, s.sibling])
		.await
		.unwrap();
	let json = serde_json::to_value(&object).unwrap();
	assert_eq!(json["operation"], "table.read");
	assert_eq!(json["default"], true);
	assert_eq!(json["exceptions"][0], s.sibling.id.to_string());
	assert_eq!(json["baseline"], false);
	assert_eq!(json["resolved"].as_array().map(Vec::len), Some(2));
}

// ============================================================================
// Assignment lifecycle
// ============================================================================

#[tokio::test]
async fn test_assign_is_idempotent_and_replaces() {
	let (authorizer, s, _dir) = setup(None).await;
	let a = Subject::User(UserId::generate());

	authorizer.assign(a, s.table, RoleUid::Viewer).await.unwrap();
	authorizer.assign(a, s.table, RoleUid::Viewer).await.unwrap();
	authorizer.assign(a, s.table, RoleUid::Editor).await.unwrap();

	let assignments = authorizer
		.store()
		.list_assignments_for_subject(a)
		.await
		.unwrap();
	assert_eq!(assignments.len(), 1);
	assert_eq!(assignments[0].role, RoleUid::Editor);
	assert!(authorizer
		.can(a, &ops::CREATE_ROW, &s.table)
		.await
		.unwrap());
}

#[tokio::test]
async fn test_revoke_restores_inherited_role() {
	let (authorizer, s, _dir) = setup(None).await;
	let a = Subject::User(UserId::generate());
	authorizer
		.assign(a, s.workspace, RoleUid::Viewer)
		.await
		.unwrap();
	authorizer.assign(a, s.table, RoleUid::Admin).await.unwrap();

	assert!(authorizer.revoke(a, s.table).await.unwrap());
	assert!(!authorizer.revoke(a, s.table).await.unwrap());

	let nearest = authorizer.find_nearest(a, &s.table).await.unwrap().unwrap();
	assert_eq!(nearest.scope, s.workspace);
	assert!(!authorizer
		.can(a, &ops::DELETE_TABLE, &s.table)
		.await
		.unwrap());
}

#[tokio::test]
async fn test_revoke_all_for_scope_keeps_ancestors() {
	let (authorizer, s, _dir) = setup(None).await;
	let a = Subject::User(UserId::generate());
	let b = Subject::Team(TeamId::generate());
	authorizer
		.assign(a, s.workspace, RoleUid::Viewer)
		.await
		.unwrap();
	authorizer.assign(a, s.table, RoleUid::Editor).await.unwrap();
	authorizer.assign(b, s.table, RoleUid::Editor).await.unwrap();

	let removed = authorizer
		.store()
		.revoke_all_for_scope(s.table)
		.await
		.unwrap();
	assert_eq!(removed, 2);
	assert_eq!(
		authorizer
			.store()
			.list_assignments_for_subject(a)
			.await
			.unwrap()
			.len(),
		1
	);
}

#[tokio::test]
async fn test_allowed_operations() {
	let (authorizer, s, _dir) = setup(None).await;
	let a = Subject::User(UserId::generate());
	authorizer
		.assign(a, s.workspace, RoleUid::Builder)
		.await
		.unwrap();

	let ops_on_database: Vec<&str> = authorizer
		.allowed_operations(a, &s.database)
		.await
		.unwrap()
		.into_iter()
		.map(|op| op.id)
		.collect();
	assert!(ops_on_database.contains(&ops::CREATE_TABLE.id));
	assert!(ops_on_database.contains(&ops::READ_DATABASE.id));

	let ops_on_workspace: Vec<&str> = authorizer
		.allowed_operations(a, &s.workspace)
		.await
		.unwrap()
		.into_iter()
		.map(|op| op.id)
		.collect();
	assert!(!ops_on_workspace.contains(&ops::ASSIGN_ROLE.id));
	assert!(!ops_on_workspace.contains(&ops::DELETE_WORKSPACE.id));
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_custom_role_table() {
	let dir = tempdir().unwrap();
	let mut table = RoleTable::from_catalog(&RoleCatalog::builtin().unwrap());
	table
		.roles
		.get_mut("viewer")
		.unwrap()
		.operations
		.insert(ops::COMMENT_ROW.id.to_string(), true);
	let path = dir.path().join("roles.toml");
	std::fs::write(&path, table.to_toml_string().unwrap()).unwrap();

	let config = RbacConfig {
		role_table_path: Some(path),
		..RbacConfig::default()
	};
	let (authorizer, s, _db_dir) = setup(Some(config)).await;
	let a = Subject::User(UserId::generate());
	authorizer.assign(a, s.table, RoleUid::Viewer).await.unwrap();

	assert!(authorizer
		.can(a, &ops::COMMENT_ROW, &s.rows[0])
		.await
		.unwrap());
}

#[tokio::test]
async fn test_incomplete_role_table_fails_at_startup() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("roles.toml");
	std::fs::write(
		&path,
		"[roles.no_access]\nname = \"No access\"\n\n[roles.no_access.operations]\n\"table.read\" = false\n",
	)
	.unwrap();

	let config = RbacConfig {
		database_url: format!("sqlite:{}?mode=rwc", dir.path().join("rbac.db").display()),
		role_table_path: Some(path),
	};
	let (forest, _) = build_forest();
	let err = Authorizer::from_config(&config, Arc::new(forest))
		.await
		.err()
		.unwrap();
	assert!(matches!(
		err,
		RbacServerError::Rbac(RbacError::IncompleteRole { .. })
	));
}
