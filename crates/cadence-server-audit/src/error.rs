// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the audit engine.

use thiserror::Error;

/// Errors surfaced by [`AuditRecordStore`](crate::store::AuditRecordStore)
/// implementations.
///
/// Conflicts and missing rows stay distinct variants so callers can react to
/// them; everything else collapses into `Backend` with the driver's message.
#[derive(Debug, Error)]
pub enum StoreError {
	/// A uniqueness constraint was violated.
	#[error("conflict: {0}")]
	Conflict(String),

	/// The requested record does not exist.
	#[error("record not found")]
	NotFound,

	/// The backing store failed.
	#[error("store backend error: {0}")]
	Backend(String),
}

/// Errors surfaced by the audit engine.
#[derive(Debug, Error)]
pub enum AuditError {
	#[error(transparent)]
	Store(#[from] StoreError),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Convenience result type for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
