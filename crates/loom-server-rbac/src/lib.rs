// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role-based access control server implementation for Loom.
//!
//! This crate persists role assignments and exposes the [`Authorizer`], which
//! combines them with the role catalog and the host application's scope tree.
//!
//! # Architecture
//!
//! - `repository` - Role assignment store trait and its SQLite implementation
//! - `memory` - In-memory store for tests and embedded use
//! - `authorizer` - Single-object checks, bulk permission objects and filtering
//! - `config` - Layered configuration and role table loading
//!
//! # Example
//!
//! ```ignore
//! use loom_server_rbac::{load_config, Authorizer, ops};
//!
//! let config = load_config()?;
//! let authorizer = Authorizer::from_config(&config, scope_tree).await?;
//!
//! authorizer.check(user.into(), &ops::UPDATE_TABLE, &table).await?;
//! let visible = authorizer.filter(user.into(), ops::READ_TABLE, tables).await?;
//! ```

pub mod authorizer;
pub mod config;
pub mod error;
pub mod memory;
pub mod pool;
pub mod repository;
pub mod schema;

#[cfg(test)]
mod testing;

pub use authorizer::Authorizer;
pub use config::{
	load_catalog, load_config, load_config_from, ConfigSource, DefaultsSource, EnvSource,
	Precedence, RbacConfig, RbacConfigLayer, TomlSource,
};
pub use error::{RbacServerError, Result};
pub use memory::InMemoryRoleAssignmentStore;
pub use pool::create_pool;
pub use repository::{RoleAssignmentStore, SqliteRoleAssignmentRepository};
pub use schema::install_schema;

// Re-export core types for convenience
pub use loom_rbac_core::*;
