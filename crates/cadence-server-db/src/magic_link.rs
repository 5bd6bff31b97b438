// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite repository for magic links.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use std::collections::BTreeSet;
use uuid::Uuid;

use cadence_server_auth::{MagicLinkId, WorkspaceId};
use cadence_server_magiclink::{MagicLink, MagicLinkStore, Scope, StoreError};

use crate::error::{DbError, Result};

const SELECT_COLUMNS: &str = "id, token, workspace_id, email, display_name, scopes, pin_hash, \
	 expires_at, is_active, created_at, accessed_at";

pub struct SqliteMagicLinkRepository {
	pool: SqlitePool,
}

impl SqliteMagicLinkRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, link), fields(link_id = %link.id))]
	async fn insert_link(&self, link: &MagicLink) -> Result<()> {
		let scopes = serde_json::to_string(&link.scopes)?;
		sqlx::query(
			"INSERT INTO magic_links \
			 (id, token, workspace_id, email, display_name, scopes, pin_hash, \
			  expires_at, is_active, created_at, accessed_at) \
			 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
		)
		.bind(link.id.to_string())
		.bind(&link.token)
		.bind(link.workspace_id.to_string())
		.bind(&link.email)
		.bind(&link.display_name)
		.bind(scopes)
		.bind(&link.pin_hash)
		.bind(link.expires_at.to_rfc3339())
		.bind(link.is_active as i64)
		.bind(link.created_at.to_rfc3339())
		.bind(link.accessed_at.map(|t| t.to_rfc3339()))
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::from_sqlx(e, "magic link insert"))?;
		Ok(())
	}

	async fn fetch_by_token(&self, token: &str) -> Result<Option<MagicLink>> {
		let sql = format!("SELECT {SELECT_COLUMNS} FROM magic_links WHERE token = ?");
		let row = sqlx::query(&sql)
			.bind(token)
			.fetch_optional(&self.pool)
			.await?;
		row.map(row_to_link).transpose()
	}
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid {column} timestamp: {e}")))
}

fn row_to_link(row: sqlx::sqlite::SqliteRow) -> Result<MagicLink> {
	let id_str: String = row.get("id");
	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("invalid magic link id: {e}")))?;

	let workspace_str: String = row.get("workspace_id");
	let workspace_id = Uuid::parse_str(&workspace_str)
		.map_err(|e| DbError::Internal(format!("invalid workspace id: {e}")))?;

	let scopes_str: String = row.get("scopes");
	let scopes: BTreeSet<Scope> = serde_json::from_str(&scopes_str)?;

	let expires_str: String = row.get("expires_at");
	let created_str: String = row.get("created_at");
	let accessed_str: Option<String> = row.get("accessed_at");
	let is_active: i64 = row.get("is_active");

	Ok(MagicLink {
		id: MagicLinkId::new(id),
		token: row.get("token"),
		workspace_id: WorkspaceId::new(workspace_id),
		email: row.get("email"),
		display_name: row.get("display_name"),
		scopes,
		pin_hash: row.get("pin_hash"),
		expires_at: parse_timestamp(&expires_str, "expires_at")?,
		is_active: is_active != 0,
		created_at: parse_timestamp(&created_str, "created_at")?,
		accessed_at: accessed_str
			.map(|s| parse_timestamp(&s, "accessed_at"))
			.transpose()?,
	})
}

fn to_store_error(err: DbError) -> StoreError {
	match err {
		DbError::Conflict(msg) => StoreError::Conflict(msg),
		DbError::NotFound(_) => StoreError::NotFound,
		other => StoreError::Backend(other.to_string()),
	}
}

#[async_trait]
impl MagicLinkStore for SqliteMagicLinkRepository {
	async fn insert(&self, link: &MagicLink) -> std::result::Result<(), StoreError> {
		self.insert_link(link).await.map_err(to_store_error)
	}

	async fn find_by_token(
		&self,
		token: &str,
	) -> std::result::Result<Option<MagicLink>, StoreError> {
		self.fetch_by_token(token).await.map_err(to_store_error)
	}

	async fn find_active_for_recipient(
		&self,
		workspace_id: WorkspaceId,
		email: &str,
	) -> std::result::Result<Option<MagicLink>, StoreError> {
		let sql = format!(
			"SELECT {SELECT_COLUMNS} FROM magic_links \
			 WHERE workspace_id = ? AND email = ? AND is_active = 1 \
			 ORDER BY created_at DESC LIMIT 1"
		);
		let row = sqlx::query(&sql)
			.bind(workspace_id.to_string())
			.bind(email)
			.fetch_optional(&self.pool)
			.await
			.map_err(|e| to_store_error(DbError::Sqlx(e)))?;
		row.map(row_to_link)
			.transpose()
			.map_err(to_store_error)
	}

	async fn list_for_workspace(
		&self,
		workspace_id: WorkspaceId,
	) -> std::result::Result<Vec<MagicLink>, StoreError> {
		let sql = format!(
			"SELECT {SELECT_COLUMNS} FROM magic_links \
			 WHERE workspace_id = ? ORDER BY created_at DESC"
		);
		let rows = sqlx::query(&sql)
			.bind(workspace_id.to_string())
			.fetch_all(&self.pool)
			.await
			.map_err(|e| to_store_error(DbError::Sqlx(e)))?;
		rows.into_iter()
			.map(|row| row_to_link(row).map_err(to_store_error))
			.collect()
	}

	async fn update(&self, link: &MagicLink) -> std::result::Result<(), StoreError> {
		let result = sqlx::query(
			"UPDATE magic_links SET is_active = ?, accessed_at = ? WHERE id = ?",
		)
		.bind(link.is_active as i64)
		.bind(link.accessed_at.map(|t| t.to_rfc3339()))
		.bind(link.id.to_string())
		.execute(&self.pool)
		.await
		.map_err(|e| to_store_error(DbError::Sqlx(e)))?;

		if result.rows_affected() == 0 {
			return Err(StoreError::NotFound);
		}
		Ok(())
	}

	async fn deactivate_for_recipient(
		&self,
		workspace_id: WorkspaceId,
		email: &str,
	) -> std::result::Result<u64, StoreError> {
		let result = sqlx::query(
			"UPDATE magic_links SET is_active = 0 \
			 WHERE workspace_id = ? AND email = ? AND is_active = 1",
		)
		.bind(workspace_id.to_string())
		.bind(email)
		.execute(&self.pool)
		.await
		.map_err(|e| to_store_error(DbError::Sqlx(e)))?;
		Ok(result.rows_affected())
	}

	async fn deactivate_expired(
		&self,
		now: DateTime<Utc>,
	) -> std::result::Result<u64, StoreError> {
		let result = sqlx::query(
			"UPDATE magic_links SET is_active = 0 \
			 WHERE is_active = 1 AND expires_at <= ?",
		)
		.bind(now.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| to_store_error(DbError::Sqlx(e)))?;
		Ok(result.rows_affected())
	}

	async fn delete_inactive_expired_before(
		&self,
		cutoff: DateTime<Utc>,
	) -> std::result::Result<u64, StoreError> {
		let result = sqlx::query(
			"DELETE FROM magic_links WHERE is_active = 0 AND expires_at < ?",
		)
		.bind(cutoff.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| to_store_error(DbError::Sqlx(e)))?;
		Ok(result.rows_affected())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_magic_link_test_pool;
	use chrono::Duration;

	fn link(workspace_id: WorkspaceId, email: &str, token: &str) -> MagicLink {
		let now = Utc::now();
		MagicLink {
			id: MagicLinkId::generate(),
			token: token.to_string(),
			workspace_id,
			email: email.to_string(),
			display_name: "Pat Client".to_string(),
			scopes: BTreeSet::from([Scope::View, Scope::Comment]),
			pin_hash: Some("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string()),
			expires_at: now + Duration::days(14),
			is_active: true,
			created_at: now,
			accessed_at: None,
		}
	}

	#[tokio::test]
	async fn insert_and_find_roundtrip() {
		let pool = create_magic_link_test_pool().await;
		let repo = SqliteMagicLinkRepository::new(pool);
		let workspace = WorkspaceId::generate();
		let original = link(workspace, "client@example.com", "tok-roundtrip");

		repo.insert(&original).await.unwrap();
		let found = repo.find_by_token("tok-roundtrip").await.unwrap().unwrap();

		assert_eq!(found.id, original.id);
		assert_eq!(found.workspace_id, workspace);
		assert_eq!(found.email, original.email);
		assert_eq!(found.scopes, original.scopes);
		assert_eq!(found.pin_hash, original.pin_hash);
		assert!(found.is_active);
		assert!(found.accessed_at.is_none());
		// RFC 3339 text keeps sub-second precision through the roundtrip.
		assert_eq!(found.expires_at, original.expires_at);
	}

	#[tokio::test]
	async fn duplicate_token_surfaces_conflict() {
		let pool = create_magic_link_test_pool().await;
		let repo = SqliteMagicLinkRepository::new(pool);
		let workspace = WorkspaceId::generate();

		repo.insert(&link(workspace, "a@example.com", "tok-dup"))
			.await
			.unwrap();
		let err = repo
			.insert(&link(workspace, "b@example.com", "tok-dup"))
			.await
			.unwrap_err();
		assert!(matches!(err, StoreError::Conflict(_)));
	}

	#[tokio::test]
	async fn find_active_for_recipient_ignores_inactive_rows() {
		let pool = create_magic_link_test_pool().await;
		let repo = SqliteMagicLinkRepository::new(pool);
		let workspace = WorkspaceId::generate();

		let mut old = link(workspace, "client@example.com", "tok-old");
		old.is_active = false;
		repo.insert(&old).await.unwrap();
		let current = link(workspace, "client@example.com", "tok-current");
		repo.insert(&current).await.unwrap();

		let found = repo
			.find_active_for_recipient(workspace, "client@example.com")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(found.id, current.id);
	}

	#[tokio::test]
	async fn update_persists_lifecycle_fields_only() {
		let pool = create_magic_link_test_pool().await;
		let repo = SqliteMagicLinkRepository::new(pool);
		let workspace = WorkspaceId::generate();
		let original = link(workspace, "client@example.com", "tok-upd");
		repo.insert(&original).await.unwrap();

		let mut changed = original.clone();
		changed.is_active = false;
		changed.accessed_at = Some(Utc::now());
		repo.update(&changed).await.unwrap();

		let stored = repo.find_by_token("tok-upd").await.unwrap().unwrap();
		assert!(!stored.is_active);
		assert!(stored.accessed_at.is_some());
	}

	#[tokio::test]
	async fn update_unknown_id_is_not_found() {
		let pool = create_magic_link_test_pool().await;
		let repo = SqliteMagicLinkRepository::new(pool);

		let err = repo
			.update(&link(WorkspaceId::generate(), "x@example.com", "tok-x"))
			.await
			.unwrap_err();
		assert!(matches!(err, StoreError::NotFound));
	}

	#[tokio::test]
	async fn deactivate_for_recipient_counts_affected_rows() {
		let pool = create_magic_link_test_pool().await;
		let repo = SqliteMagicLinkRepository::new(pool);
		let workspace = WorkspaceId::generate();

		repo.insert(&link(workspace, "client@example.com", "tok-1"))
			.await
			.unwrap();
		repo.insert(&link(workspace, "other@example.com", "tok-2"))
			.await
			.unwrap();

		let count = repo
			.deactivate_for_recipient(workspace, "client@example.com")
			.await
			.unwrap();
		assert_eq!(count, 1);
		assert!(repo
			.find_active_for_recipient(workspace, "client@example.com")
			.await
			.unwrap()
			.is_none());
		assert!(repo
			.find_active_for_recipient(workspace, "other@example.com")
			.await
			.unwrap()
			.is_some());
	}

	#[tokio::test]
	async fn deactivate_expired_is_idempotent() {
		let pool = create_magic_link_test_pool().await;
		let repo = SqliteMagicLinkRepository::new(pool);
		let workspace = WorkspaceId::generate();

		let mut expired = link(workspace, "a@example.com", "tok-exp");
		expired.expires_at = Utc::now() - Duration::hours(1);
		repo.insert(&expired).await.unwrap();
		repo.insert(&link(workspace, "b@example.com", "tok-live"))
			.await
			.unwrap();

		assert_eq!(repo.deactivate_expired(Utc::now()).await.unwrap(), 1);
		assert_eq!(repo.deactivate_expired(Utc::now()).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn purge_deletes_only_inactive_expired_rows() {
		let pool = create_magic_link_test_pool().await;
		let repo = SqliteMagicLinkRepository::new(pool);
		let workspace = WorkspaceId::generate();

		let mut purgeable = link(workspace, "a@example.com", "tok-purge");
		purgeable.is_active = false;
		purgeable.expires_at = Utc::now() - Duration::days(60);
		repo.insert(&purgeable).await.unwrap();

		let mut expired_active = link(workspace, "b@example.com", "tok-keep");
		expired_active.expires_at = Utc::now() - Duration::days(60);
		repo.insert(&expired_active).await.unwrap();

		let deleted = repo
			.delete_inactive_expired_before(Utc::now() - Duration::days(30))
			.await
			.unwrap();
		assert_eq!(deleted, 1);
		assert_eq!(repo.list_for_workspace(workspace).await.unwrap().len(), 1);
	}
}
