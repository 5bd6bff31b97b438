// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema creation for the two Cadence tables.
//!
//! Timestamps are RFC 3339 text; scope sets, tags, and value maps are JSON
//! text columns. The unique index on `magic_links.token` backs the
//! conflict-on-duplicate-token contract.

use sqlx::sqlite::SqlitePool;

use crate::error::Result;

pub async fn create_magic_links_table(pool: &SqlitePool) -> Result<()> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS magic_links (
			id TEXT PRIMARY KEY,
			token TEXT NOT NULL UNIQUE,
			workspace_id TEXT NOT NULL,
			email TEXT NOT NULL,
			display_name TEXT NOT NULL,
			scopes TEXT NOT NULL,
			pin_hash TEXT,
			expires_at TEXT NOT NULL,
			is_active INTEGER NOT NULL DEFAULT 1,
			created_at TEXT NOT NULL,
			accessed_at TEXT
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_magic_links_recipient \
		 ON magic_links (workspace_id, email)",
	)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn create_audit_records_table(pool: &SqlitePool) -> Result<()> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS audit_records (
			id TEXT PRIMARY KEY,
			action TEXT NOT NULL,
			auditable_type TEXT,
			auditable_id TEXT,
			old_values TEXT NOT NULL,
			new_values TEXT NOT NULL,
			workspace_id TEXT,
			user_id TEXT,
			user_type TEXT NOT NULL,
			severity TEXT NOT NULL,
			tags TEXT NOT NULL,
			request_data TEXT,
			response_data TEXT,
			ip_address TEXT,
			user_agent TEXT,
			session_id TEXT,
			expires_at TEXT,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_audit_records_workspace_created \
		 ON audit_records (workspace_id, created_at)",
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_audit_records_created \
		 ON audit_records (created_at)",
	)
	.execute(pool)
	.await?;

	Ok(())
}

/// Create every Cadence table and index.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	create_magic_links_table(pool).await?;
	create_audit_records_table(pool).await?;
	tracing::debug!("schema migrations applied");
	Ok(())
}
