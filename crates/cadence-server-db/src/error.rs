// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl DbError {
	/// Classify a sqlx error, surfacing unique-constraint violations as
	/// `Conflict` rather than a generic database error.
	pub fn from_sqlx(err: sqlx::Error, context: &str) -> Self {
		match &err {
			sqlx::Error::Database(db) if db.is_unique_violation() => {
				DbError::Conflict(format!("{context}: {db}"))
			}
			_ => DbError::Sqlx(err),
		}
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
