// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::error::DbError;

/// Audit writes, link validation reads, and retention sweeps all share one
/// pool; this caps the writers SQLite has to serialize.
const MAX_CONNECTIONS: u32 = 8;

/// How long a writer waits on SQLite's lock before the call fails.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a SqlitePool tuned for Cadence's append-heavy audit workload.
///
/// WAL mode keeps validation reads open while the audit writer appends.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./cadence.db")
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid or connection fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.busy_timeout(BUSY_TIMEOUT)
		.foreign_keys(true)
		.create_if_missing(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(MAX_CONNECTIONS)
		.connect_with(options)
		.await?;

	tracing::debug!(max_connections = MAX_CONNECTIONS, "database pool created");
	Ok(pool)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn creates_a_usable_pool_from_a_url() {
		let pool = create_pool("sqlite::memory:").await.unwrap();
		crate::schema::run_migrations(&pool).await.unwrap();

		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_records")
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(count, 0);
	}

	#[tokio::test]
	async fn rejects_an_invalid_url() {
		let err = create_pool("not a url").await.unwrap_err();
		assert!(matches!(err, DbError::Internal(_)));
	}
}
