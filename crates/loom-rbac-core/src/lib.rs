// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Loom's hierarchical role-based access control.
//!
//! Objects form a tree of scopes (workspace → database → table → view/row).
//! Subjects are granted roles at scopes, and a role is a static allow/deny
//! default for every registered operation. A check resolves the role assigned
//! at the nearest scope in the target's ancestor chain.
//!
//! This crate is pure and synchronous. Persistence of role assignments and
//! the async service facade live in `loom-server-rbac`.
//!
//! # Example
//!
//! ```
//! use loom_rbac_core::{
//!     ops, resolve, AssignmentIndex, RoleCatalog, RoleUid, ScopeForest, ScopeId, ScopeRef,
//! };
//!
//! let catalog = RoleCatalog::builtin().unwrap();
//! let mut forest = ScopeForest::new();
//! let workspace = forest.insert_workspace(ScopeId::generate());
//! let database = forest.insert(ScopeRef::database(ScopeId::generate()), workspace).unwrap();
//! let table = forest.insert(ScopeRef::table(ScopeId::generate()), database).unwrap();
//!
//! let assignments: AssignmentIndex = [(workspace, RoleUid::Viewer)].into_iter().collect();
//! let decision = resolve(&catalog, &forest, &assignments, &ops::READ_TABLE, &table).unwrap();
//! assert!(decision.allowed);
//! ```

mod builtin;
pub mod bulk;
pub mod catalog_config;
pub mod error;
pub mod filter;
pub mod operation;
pub mod resolve;
pub mod role;
pub mod scope;
pub mod types;

pub use bulk::{build_permission_object, BulkPermissionBuilder, PermissionObject};
pub use catalog_config::{RoleTable, RoleTableEntry};
pub use error::{RbacError, Result};
pub use filter::{filter, filter_by, HasScope};
pub use operation::{ops, Operation, OperationRegistry};
pub use resolve::{decide, resolve, validate_operation_scope, AssignmentIndex, ResolvedDecision};
pub use role::{Role, RoleCatalog, RoleCatalogBuilder, RoleUid};
pub use scope::{ancestor_chain, ScopeChain, ScopeForest, ScopeTree, MAX_SCOPE_DEPTH};
pub use types::{RoleAssignment, ScopeId, ScopeRef, ScopeType, Subject, TeamId, UserId};
