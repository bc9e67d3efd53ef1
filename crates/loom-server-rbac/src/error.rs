// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the RBAC server.

use std::path::PathBuf;

use loom_rbac_core::RbacError;
use thiserror::Error;

/// Errors that can occur in the RBAC server.
#[derive(Debug, Error)]
pub enum RbacServerError {
	/// Database error
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	/// Authorization or catalog error from the core crate
	#[error(transparent)]
	Rbac(#[from] RbacError),

	/// A stored row could not be decoded
	#[error("invalid stored data: {0}")]
	InvalidData(String),

	#[error("failed to read {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("invalid configuration value for {key}: {message}")]
	InvalidConfig { key: String, message: String },

	#[error("internal error: {0}")]
	Internal(String),
}

impl RbacServerError {
	/// Returns true if this is the normal "forbidden" outcome of a check.
	pub fn is_permission_denied(&self) -> bool {
		matches!(self, RbacServerError::Rbac(err) if err.is_permission_denied())
	}
}

/// Result type for RBAC server operations.
pub type Result<T> = std::result::Result<T, RbacServerError>;
