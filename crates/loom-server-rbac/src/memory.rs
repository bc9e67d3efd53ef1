// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory role assignment store for tests and embedded use.

use async_trait::async_trait;
use chrono::Utc;
use loom_rbac_core::{RoleAssignment, RoleUid, ScopeChain, ScopeId, ScopeRef, Subject};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::repository::{nearest_in_chain, RoleAssignmentStore};

#[derive(Default)]
struct Indices {
	by_subject: HashMap<Subject, BTreeMap<ScopeId, RoleAssignment>>,
	by_scope: HashMap<ScopeId, BTreeSet<Subject>>,
}

impl Indices {
	fn remove(&mut self, subject: Subject, scope: ScopeId) -> Option<RoleAssignment> {
		let assignments = self.by_subject.get_mut(&subject)?;
		let removed = assignments.remove(&scope)?;
		if assignments.is_empty() {
			self.by_subject.remove(&subject);
		}
		if let Some(subjects) = self.by_scope.get_mut(&scope) {
			subjects.remove(&subject);
			if subjects.is_empty() {
				self.by_scope.remove(&scope);
			}
		}
		Some(removed)
	}
}

/// Role assignment store backed by maps behind a single lock, so both
/// indices always change together.
#[derive(Default)]
pub struct InMemoryRoleAssignmentStore {
	inner: RwLock<Indices>,
}

impl InMemoryRoleAssignmentStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl RoleAssignmentStore for InMemoryRoleAssignmentStore {
	async fn assign(
		&self,
		subject: Subject,
		scope: ScopeRef,
		role: RoleUid,
	) -> Result<RoleAssignment> {
		let mut guard = self.inner.write().await;
		let inner = &mut *guard;
		let assignment = inner
			.by_subject
			.entry(subject)
			.or_default()
			.entry(scope.id)
			.and_modify(|existing| {
				existing.scope = scope;
				existing.role = role;
				existing.updated_at = Utc::now();
			})
			.or_insert_with(|| RoleAssignment::new(subject, scope, role))
			.clone();
		inner.by_scope.entry(scope.id).or_default().insert(subject);

		tracing::debug!(subject = %subject, scope = %scope, role = %role, "role assigned");
		Ok(assignment)
	}

	async fn revoke(&self, subject: Subject, scope: ScopeRef) -> Result<bool> {
		let removed = self.inner.write().await.remove(subject, scope.id).is_some();
		tracing::debug!(subject = %subject, scope = %scope, removed, "role revoked");
		Ok(removed)
	}

	async fn get_assignment(
		&self,
		subject: Subject,
		scope: ScopeRef,
	) -> Result<Option<RoleAssignment>> {
		let inner = self.inner.read().await;
		Ok(inner
			.by_subject
			.get(&subject)
			.and_then(|assignments| assignments.get(&scope.id))
			.cloned())
	}

	async fn find_nearest(
		&self,
		subject: Subject,
		chain: &ScopeChain,
	) -> Result<Option<RoleAssignment>> {
		let inner = self.inner.read().await;
		let Some(assignments) = inner.by_subject.get(&subject) else {
			return Ok(None);
		};
		let on_chain = chain
			.iter()
			.filter_map(|scope| assignments.get(&scope.id))
			.cloned();
		Ok(nearest_in_chain(chain, on_chain))
	}

	async fn list_assignments_for_subject(&self, subject: Subject) -> Result<Vec<RoleAssignment>> {
		let inner = self.inner.read().await;
		Ok(inner
			.by_subject
			.get(&subject)
			.map(|assignments| assignments.values().cloned().collect())
			.unwrap_or_default())
	}

	async fn list_assignments_for_scope(&self, scope: ScopeRef) -> Result<Vec<RoleAssignment>> {
		let inner = self.inner.read().await;
		let Some(subjects) = inner.by_scope.get(&scope.id) else {
			return Ok(Vec::new());
		};
		Ok(subjects
			.iter()
			.filter_map(|subject| inner.by_subject.get(subject)?.get(&scope.id).cloned())
			.collect())
	}

	async fn revoke_all_for_scope(&self, scope: ScopeRef) -> Result<u64> {
		let mut inner = self.inner.write().await;
		let subjects = inner.by_scope.get(&scope.id).cloned().unwrap_or_default();
		let mut removed = 0;
		for subject in subjects {
			if inner.remove(subject, scope.id).is_some() {
				removed += 1;
			}
		}
		tracing::debug!(scope = %scope, removed, "scope assignments revoked");
		Ok(removed)
	}
}
