// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The compiled-in role table.
//!
//! Each role's grants are its predecessor's grants plus a few more, so the
//! roles nest: viewer ⊂ commenter ⊂ editor ⊂ builder ⊂ admin. Admin is granted
//! every registered operation, including ones registered by the application.
//! Every other role denies whatever is not in its grant set.

use std::collections::HashSet;

use crate::operation::{ops, Operation, OperationRegistry};
use crate::role::{RoleCatalogBuilder, RoleUid};

fn viewer_grants() -> Vec<Operation> {
	vec![
		ops::READ_WORKSPACE,
		ops::READ_DATABASE,
		ops::READ_TABLE,
		ops::READ_VIEW,
		ops::READ_ROW,
	]
}

fn commenter_grants() -> Vec<Operation> {
	let mut grants = viewer_grants();
	grants.push(ops::COMMENT_ROW);
	grants
}

fn editor_grants() -> Vec<Operation> {
	let mut grants = commenter_grants();
	grants.extend([ops::CREATE_ROW, ops::UPDATE_ROW, ops::DELETE_ROW]);
	grants
}

fn builder_grants() -> Vec<Operation> {
	let mut grants = editor_grants();
	grants.extend([
		ops::LIST_WORKSPACE_MEMBERS,
		ops::CREATE_DATABASE,
		ops::UPDATE_DATABASE,
		ops::DELETE_DATABASE,
		ops::CREATE_TABLE,
		ops::UPDATE_TABLE,
		ops::DELETE_TABLE,
		ops::CREATE_VIEW,
		ops::UPDATE_VIEW,
		ops::DELETE_VIEW,
	]);
	grants
}

fn decisions(registry: &OperationRegistry, grants: &[Operation]) -> Vec<(&'static str, bool)> {
	let granted: HashSet<&str> = grants.iter().map(|op| op.id).collect();
	registry
		.iter()
		.map(|op| (op.id, granted.contains(op.id)))
		.collect()
}

/// Declares the built-in roles over `registry`.
pub(crate) fn catalog_builder(registry: OperationRegistry) -> RoleCatalogBuilder {
	let admin: Vec<_> = registry.iter().map(|op| (op.id, true)).collect();
	let builder = decisions(&registry, &builder_grants());
	let editor = decisions(&registry, &editor_grants());
	let commenter = decisions(&registry, &commenter_grants());
	let viewer = decisions(&registry, &viewer_grants());
	let no_access = decisions(&registry, &[]);

	RoleCatalogBuilder::new(registry)
		.role(RoleUid::Admin, "Admin", admin)
		.role(RoleUid::Builder, "Builder", builder)
		.role(RoleUid::Editor, "Editor", editor)
		.role(RoleUid::Commenter, "Commenter", commenter)
		.role(RoleUid::Viewer, "Viewer", viewer)
		.role(RoleUid::NoAccess, "No access", no_access)
}
