// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization facade over the role catalog, assignment store and scope tree.
//!
//! Single-object checks cost one store query. Collection filtering loads the
//! subject's assignments once and answers every candidate from a
//! [`PermissionObject`], so it never queries per object.

use std::sync::Arc;

use loom_rbac_core::{
	ancestor_chain, decide, filter_by, validate_operation_scope, AssignmentIndex,
	BulkPermissionBuilder, HasScope, Operation, PermissionObject, ResolvedDecision, RoleAssignment,
	RoleCatalog, RoleUid, ScopeRef, ScopeTree, Subject,
};
use tracing::instrument;

use crate::config::{load_catalog, RbacConfig};
use crate::error::Result;
use crate::pool::create_pool;
use crate::repository::{RoleAssignmentStore, SqliteRoleAssignmentRepository};
use crate::schema::install_schema;

/// Answers "may this subject perform this operation here?" for one object or many.
#[derive(Clone)]
pub struct Authorizer {
	catalog: Arc<RoleCatalog>,
	store: Arc<dyn RoleAssignmentStore>,
	tree: Arc<dyn ScopeTree>,
}

impl Authorizer {
	pub fn new(
		catalog: Arc<RoleCatalog>,
		store: Arc<dyn RoleAssignmentStore>,
		tree: Arc<dyn ScopeTree>,
	) -> Self {
		Self {
			catalog,
			store,
			tree,
		}
	}

	/// Connects to the configured database, installs the schema and loads the
	/// role table. The scope tree belongs to the host application.
	#[instrument(skip(config, tree))]
	pub async fn from_config(config: &RbacConfig, tree: Arc<dyn ScopeTree>) -> Result<Self> {
		let catalog = load_catalog(config)?;
		let pool = create_pool(&config.database_url).await?;
		install_schema(&pool).await?;
		Ok(Self::new(
			Arc::new(catalog),
			Arc::new(SqliteRoleAssignmentRepository::new(pool)),
			tree,
		))
	}

	pub fn catalog(&self) -> &RoleCatalog {
		&self.catalog
	}

	pub fn store(&self) -> &Arc<dyn RoleAssignmentStore> {
		&self.store
	}

	pub fn tree(&self) -> &(dyn ScopeTree + 'static) {
		&*self.tree
	}

	/// The subject's assignment at the nearest scope in the ancestor chain of `scope`.
	#[instrument(skip(self), fields(subject = %subject, scope = %scope))]
	pub async fn find_nearest(
		&self,
		subject: Subject,
		scope: &ScopeRef,
	) -> Result<Option<RoleAssignment>> {
		let chain = ancestor_chain(self.tree(), scope)?;
		self.store.find_nearest(subject, &chain).await
	}

	/// Resolves `operation` on `scope` without treating denial as an error.
	#[instrument(skip(self), fields(subject = %subject, operation = operation.id, scope = %scope))]
	pub async fn resolve(
		&self,
		subject: Subject,
		operation: &Operation,
		scope: &ScopeRef,
	) -> Result<ResolvedDecision> {
		validate_operation_scope(operation, scope)?;
		let chain = ancestor_chain(self.tree(), scope)?;
		let nearest = self
			.store
			.find_nearest(subject, &chain)
			.await?
			.map(|assignment| (assignment.scope, assignment.role));
		let decision = decide(&self.catalog, operation, &chain, nearest)?;

		tracing::debug!(
			subject = %subject,
			operation = operation.id,
			scope = %scope,
			role = %decision.role,
			decisive_scope = %decision.decisive_scope,
			from_baseline = decision.from_baseline,
			allowed = decision.allowed,
			"permission resolved"
		);
		Ok(decision)
	}

	/// Fails with a permission-denied error unless `subject` may perform `operation` on `scope`.
	pub async fn check(
		&self,
		subject: Subject,
		operation: &Operation,
		scope: &ScopeRef,
	) -> Result<ResolvedDecision> {
		Ok(self
			.resolve(subject, operation, scope)
			.await?
			.ensure_allowed(subject)?)
	}

	/// Like [`Authorizer::check`], with denial reported as `Ok(false)`.
	pub async fn can(
		&self,
		subject: Subject,
		operation: &Operation,
		scope: &ScopeRef,
	) -> Result<bool> {
		Ok(self.resolve(subject, operation, scope).await?.allowed)
	}

	/// Grants `role` to `subject` at `scope`, replacing any previous grant there.
	///
	/// The scope must be attached to the tree and the role declared in the catalog.
	#[instrument(skip(self), fields(subject = %subject, scope = %scope, role = %role))]
	pub async fn assign(
		&self,
		subject: Subject,
		scope: ScopeRef,
		role: RoleUid,
	) -> Result<RoleAssignment> {
		ancestor_chain(self.tree(), &scope)?;
		self.catalog.get_role(role)?;
		self.store.assign(subject, scope, role).await
	}

	#[instrument(skip(self), fields(subject = %subject, scope = %scope))]
	pub async fn revoke(&self, subject: Subject, scope: ScopeRef) -> Result<bool> {
		self.store.revoke(subject, scope).await
	}

	/// Every registered operation on `scope`'s type that `subject` may perform there.
	#[instrument(skip(self), fields(subject = %subject, scope = %scope))]
	pub async fn allowed_operations(
		&self,
		subject: Subject,
		scope: &ScopeRef,
	) -> Result<Vec<Operation>> {
		let chain = ancestor_chain(self.tree(), scope)?;
		let nearest = self
			.store
			.find_nearest(subject, &chain)
			.await?
			.map(|assignment| (assignment.scope, assignment.role));

		let mut allowed = Vec::new();
		for operation in self.catalog.registry().for_scope_type(scope.scope_type) {
			if decide(&self.catalog, operation, &chain, nearest)?.allowed {
				allowed.push(*operation);
			}
		}
		Ok(allowed)
	}

	/// All of `subject`'s assignments, loaded in one store query.
	pub async fn assignment_index(&self, subject: Subject) -> Result<AssignmentIndex> {
		let assignments = self.store.list_assignments_for_subject(subject).await?;
		Ok(assignments.iter().collect())
	}

	/// Starts a permission object for `operation`. Call
	/// [`BulkPermissionBuilder::expand`] with each page of candidates before
	/// filtering it.
	#[instrument(skip(self), fields(subject = %subject, operation = operation.id))]
	pub async fn bulk_builder(
		&self,
		subject: Subject,
		operation: Operation,
	) -> Result<BulkPermissionBuilder<'_, dyn ScopeTree>> {
		let assignments = self.assignment_index(subject).await?;
		Ok(BulkPermissionBuilder::new(
			&self.catalog,
			self.tree(),
			operation,
			assignments,
		)?)
	}

	/// Permission object for `operation`, expanded over `candidates`.
	pub async fn permission_object(
		&self,
		subject: Subject,
		operation: Operation,
		candidates: &[ScopeRef],
	) -> Result<PermissionObject> {
		let mut builder = self.bulk_builder(subject, operation).await?;
		builder.expand(candidates)?;
		let object = builder.into_permission_object();

		tracing::debug!(
			subject = %subject,
			operation = operation.id,
			candidates = candidates.len(),
			default = object.default,
			exceptions = object.exceptions.len(),
			"permission object built"
		);
		Ok(object)
	}

	/// Keeps the members of `collection` that `subject` may perform `operation`
	/// on, in their original order.
	///
	/// Every item is taken to be an object of the operation's scope type.
	pub async fn filter<T: HasScope>(
		&self,
		subject: Subject,
		operation: Operation,
		collection: Vec<T>,
	) -> Result<Vec<T>> {
		let candidates: Vec<ScopeRef> = collection
			.iter()
			.map(|item| ScopeRef::new(operation.scope_type, item.scope_id()))
			.collect();
		let object = self
			.permission_object(subject, operation, &candidates)
			.await?;
		Ok(filter_by(collection, &object, |item| item.scope_id()))
	}
}
