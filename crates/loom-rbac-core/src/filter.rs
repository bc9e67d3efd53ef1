// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Collection filtering with a precomputed [`PermissionObject`].

use crate::bulk::PermissionObject;
use crate::types::{ScopeId, ScopeRef};

/// Anything that can be filtered by the id of the scope it represents.
pub trait HasScope {
	fn scope_id(&self) -> ScopeId;
}

impl HasScope for ScopeId {
	fn scope_id(&self) -> ScopeId {
		*self
	}
}

impl HasScope for ScopeRef {
	fn scope_id(&self) -> ScopeId {
		self.id
	}
}

impl<T: HasScope + ?Sized> HasScope for &T {
	fn scope_id(&self) -> ScopeId {
		(**self).scope_id()
	}
}

/// Keeps the permitted members of `collection`, in their original order.
pub fn filter<I>(collection: I, object: &PermissionObject) -> Vec<I::Item>
where
	I: IntoIterator,
	I::Item: HasScope,
{
	filter_by(collection, object, |item| item.scope_id())
}

/// Like [`filter`], with the scope id taken from each item by `key`.
pub fn filter_by<I, F>(collection: I, object: &PermissionObject, key: F) -> Vec<I::Item>
where
	I: IntoIterator,
	F: Fn(&I::Item) -> ScopeId,
{
	collection
		.into_iter()
		.filter(|item| object.is_allowed(key(item)))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, Clone, PartialEq)]
	struct TableRow {
		id: ScopeId,
		name: &'static str,
	}

	#[test]
	fn default_deny_keeps_only_exceptions() {
		let allowed = ScopeId::generate();
		let denied = ScopeId::generate();
		let mut object = PermissionObject::new("table.read", false, false);
		object.record(allowed, true);
		object.record(denied, false);
		assert_eq!(filter([denied, allowed, denied], &object), vec![allowed]);
	}

	#[test]
	fn default_allow_drops_exceptions() {
		let a = ScopeId::generate();
		let b = ScopeId::generate();
		let c = ScopeId::generate();
		let mut object = PermissionObject::new("table.read", true, false);
		object.record(a, true);
		object.record(b, false);
		object.record(c, true);
		assert_eq!(object.exceptions.len(), 1);
		assert_eq!(filter(vec![a, b, c], &object), vec![a, c]);
	}

	#[test]
	fn unresolved_ids_get_the_baseline() {
		let resolved = ScopeId::generate();
		let unresolved = ScopeId::generate();
		let mut object = PermissionObject::new("table.read", true, false);
		object.record(resolved, true);
		assert!(!object.is_allowed(unresolved));
		assert_eq!(filter([unresolved, resolved], &object), vec![resolved]);
	}

	#[test]
	fn preserves_order_and_duplicates() {
		let a = ScopeId::generate();
		let b = ScopeId::generate();
		let mut object = PermissionObject::new("row.read", true, false);
		object.record(a, true);
		object.record(b, true);
		assert_eq!(filter([b, a, b], &object), vec![b, a, b]);
	}

	#[test]
	fn empty_result_is_not_an_error() {
		let object = PermissionObject::new("row.read", false, false);
		assert!(filter(Vec::<ScopeId>::new(), &object).is_empty());
		assert!(filter([ScopeId::generate()], &object).is_empty());
	}

	#[test]
	fn filter_by_key() {
		let visible = TableRow {
			id: ScopeId::generate(),
			name: "orders",
		};
		let hidden = TableRow {
			id: ScopeId::generate(),
			name: "salaries",
		};
		let mut object = PermissionObject::new("table.read", true, false);
		object.record(visible.id, true);
		object.record(hidden.id, false);

		let kept = filter_by(vec![visible.clone(), hidden], &object, |row| row.id);
		assert_eq!(kept, vec![visible]);
	}

	#[test]
	fn filters_borrowed_items() {
		let scopes = vec![ScopeRef::table(ScopeId::generate())];
		let mut object = PermissionObject::new("table.read", true, false);
		object.record(scopes[0].id, true);
		let kept: Vec<&ScopeRef> = filter(&scopes, &object);
		assert_eq!(kept.len(), 1);
	}
}
