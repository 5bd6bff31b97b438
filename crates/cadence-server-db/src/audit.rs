// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite repository for audit records.
//!
//! Reads and deletes share one dynamically-assembled WHERE clause so every
//! entry point agrees on what each [`AuditQuery`] criterion means.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{sqlite::SqlitePool, Row};
use std::collections::BTreeSet;
use uuid::Uuid;

use cadence_server_audit::{
	ActionKind, AuditQuery, AuditRecord, AuditRecordId, AuditRecordStore, AuditSeverity,
	AuditableRef, QueryOrder, StoreError,
};
use cadence_server_auth::{UserType, WorkspaceId};

use crate::error::{DbError, Result};

const SELECT_COLUMNS: &str = "id, action, auditable_type, auditable_id, old_values, new_values, \
	 workspace_id, user_id, user_type, severity, tags, request_data, response_data, \
	 ip_address, user_agent, session_id, expires_at, created_at";

pub struct SqliteAuditRepository {
	pool: SqlitePool,
}

impl SqliteAuditRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, record), fields(record_id = %record.id))]
	async fn insert_record(&self, record: &AuditRecord) -> Result<()> {
		let old_values = serde_json::to_string(&record.old_values)?;
		let new_values = serde_json::to_string(&record.new_values)?;
		let tags = serde_json::to_string(&record.tags)?;
		let request_data = record
			.request_data
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;
		let response_data = record
			.response_data
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		sqlx::query(
			"INSERT INTO audit_records \
			 (id, action, auditable_type, auditable_id, old_values, new_values, \
			  workspace_id, user_id, user_type, severity, tags, request_data, \
			  response_data, ip_address, user_agent, session_id, expires_at, created_at) \
			 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
		)
		.bind(record.id.to_string())
		.bind(record.action.as_str())
		.bind(record.auditable.as_ref().map(|a| a.type_name.clone()))
		.bind(record.auditable.as_ref().map(|a| a.id.clone()))
		.bind(old_values)
		.bind(new_values)
		.bind(record.workspace_id.map(|w| w.to_string()))
		.bind(&record.user_id)
		.bind(record.user_type.as_str())
		.bind(record.severity.as_str())
		.bind(tags)
		.bind(request_data)
		.bind(response_data)
		.bind(&record.ip_address)
		.bind(&record.user_agent)
		.bind(&record.session_id)
		.bind(record.expires_at.map(|t| t.to_rfc3339()))
		.bind(record.created_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::from_sqlx(e, "audit record insert"))?;
		Ok(())
	}
}

/// Build the WHERE clause and its bind values for a filter. Every bind is
/// text; the caller appends them in order.
fn filter_clauses(filter: &AuditQuery) -> (String, Vec<String>) {
	let mut conditions = vec!["1=1".to_string()];
	let mut binds = Vec::new();

	if let Some(workspace_id) = filter.workspace_id {
		conditions.push("workspace_id = ?".to_string());
		binds.push(workspace_id.to_string());
	}
	if let Some(action) = filter.action {
		conditions.push("action = ?".to_string());
		binds.push(action.as_str().to_string());
	}
	if let Some(severities) = &filter.severities {
		if severities.is_empty() {
			conditions.push("1=0".to_string());
		} else {
			let placeholders = vec!["?"; severities.len()].join(", ");
			conditions.push(format!("severity IN ({placeholders})"));
			binds.extend(severities.iter().map(|s| s.as_str().to_string()));
		}
	}
	if let Some(user_id) = &filter.user_id {
		conditions.push("user_id = ?".to_string());
		binds.push(user_id.clone());
	}
	if let Some(user_type) = filter.user_type {
		conditions.push("user_type = ?".to_string());
		binds.push(user_type.as_str().to_string());
	}
	if let Some(auditable) = &filter.auditable {
		conditions.push("auditable_type = ? AND auditable_id = ?".to_string());
		binds.push(auditable.type_name.clone());
		binds.push(auditable.id.clone());
	}
	if let Some(created_after) = filter.created_after {
		conditions.push("created_at >= ?".to_string());
		binds.push(created_after.to_rfc3339());
	}
	if let Some(created_before) = filter.created_before {
		conditions.push("created_at < ?".to_string());
		binds.push(created_before.to_rfc3339());
	}
	if let Some(expired_as_of) = filter.expired_as_of {
		conditions.push("expires_at IS NOT NULL AND expires_at <= ?".to_string());
		binds.push(expired_as_of.to_rfc3339());
	}

	(conditions.join(" AND "), binds)
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid {column} timestamp: {e}")))
}

fn parse_json_map(value: &str, column: &str) -> Result<Map<String, Value>> {
	match serde_json::from_str(value)? {
		Value::Object(map) => Ok(map),
		_ => Err(DbError::Internal(format!("{column} is not a JSON object"))),
	}
}

fn row_to_record(row: sqlx::sqlite::SqliteRow) -> Result<AuditRecord> {
	let id_str: String = row.get("id");
	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("invalid audit record id: {e}")))?;

	let action_str: String = row.get("action");
	let action = ActionKind::parse(&action_str)
		.ok_or_else(|| DbError::Internal(format!("unknown action: {action_str}")))?;

	let user_type_str: String = row.get("user_type");
	let user_type = UserType::parse(&user_type_str)
		.ok_or_else(|| DbError::Internal(format!("unknown user type: {user_type_str}")))?;

	let severity_str: String = row.get("severity");
	let severity = AuditSeverity::parse(&severity_str)
		.ok_or_else(|| DbError::Internal(format!("unknown severity: {severity_str}")))?;

	let auditable_type: Option<String> = row.get("auditable_type");
	let auditable_id: Option<String> = row.get("auditable_id");
	let auditable = match (auditable_type, auditable_id) {
		(Some(type_name), Some(id)) => Some(AuditableRef { type_name, id }),
		_ => None,
	};

	let workspace_str: Option<String> = row.get("workspace_id");
	let workspace_id = workspace_str
		.map(|s| {
			Uuid::parse_str(&s)
				.map(WorkspaceId::new)
				.map_err(|e| DbError::Internal(format!("invalid workspace id: {e}")))
		})
		.transpose()?;

	let old_values_str: String = row.get("old_values");
	let new_values_str: String = row.get("new_values");
	let tags_str: String = row.get("tags");
	let tags: BTreeSet<String> = serde_json::from_str(&tags_str)?;

	let request_str: Option<String> = row.get("request_data");
	let response_str: Option<String> = row.get("response_data");
	let expires_str: Option<String> = row.get("expires_at");
	let created_str: String = row.get("created_at");

	Ok(AuditRecord {
		id: AuditRecordId::new(id),
		action,
		auditable,
		old_values: parse_json_map(&old_values_str, "old_values")?,
		new_values: parse_json_map(&new_values_str, "new_values")?,
		workspace_id,
		user_id: row.get("user_id"),
		user_type,
		severity,
		tags,
		request_data: request_str
			.map(|s| parse_json_map(&s, "request_data"))
			.transpose()?,
		response_data: response_str
			.map(|s| parse_json_map(&s, "response_data"))
			.transpose()?,
		ip_address: row.get("ip_address"),
		user_agent: row.get("user_agent"),
		session_id: row.get("session_id"),
		expires_at: expires_str
			.map(|s| parse_timestamp(&s, "expires_at"))
			.transpose()?,
		created_at: parse_timestamp(&created_str, "created_at")?,
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
impl AuditRecordStore for SqliteAuditRepository {
	async fn insert(&self, record: &AuditRecord) -> std::result::Result<(), StoreError> {
		self.insert_record(record).await.map_err(to_store_error)
	}

	async fn find_by_id(
		&self,
		id: AuditRecordId,
	) -> std::result::Result<Option<AuditRecord>, StoreError> {
		let sql = format!("SELECT {SELECT_COLUMNS} FROM audit_records WHERE id = ?");
		let row = sqlx::query(&sql)
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await
			.map_err(|e| to_store_error(DbError::Sqlx(e)))?;
		row.map(row_to_record)
			.transpose()
			.map_err(to_store_error)
	}

	async fn query(
		&self,
		filter: &AuditQuery,
	) -> std::result::Result<Vec<AuditRecord>, StoreError> {
		let (where_clause, binds) = filter_clauses(filter);
		let order = match filter.order {
			QueryOrder::NewestFirst => "DESC",
			QueryOrder::OldestFirst => "ASC",
		};

		let mut sql = format!(
			"SELECT {SELECT_COLUMNS} FROM audit_records \
			 WHERE {where_clause} ORDER BY created_at {order}"
		);
		// SQLite requires a LIMIT before OFFSET; -1 means unbounded.
		if filter.limit.is_some() || filter.offset.is_some() {
			sql.push_str(" LIMIT ? OFFSET ?");
		}

		let mut query = sqlx::query(&sql);
		for bind in &binds {
			query = query.bind(bind);
		}
		if filter.limit.is_some() || filter.offset.is_some() {
			let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
			let offset = filter.offset.unwrap_or(0) as i64;
			query = query.bind(limit).bind(offset);
		}

		let rows = query
			.fetch_all(&self.pool)
			.await
			.map_err(|e| to_store_error(DbError::Sqlx(e)))?;
		rows.into_iter()
			.map(|row| row_to_record(row).map_err(to_store_error))
			.collect()
	}

	async fn count(&self, filter: &AuditQuery) -> std::result::Result<u64, StoreError> {
		let (where_clause, binds) = filter_clauses(filter);
		let sql = format!("SELECT COUNT(*) as cnt FROM audit_records WHERE {where_clause}");

		let mut query = sqlx::query(&sql);
		for bind in &binds {
			query = query.bind(bind);
		}

		let row = query
			.fetch_one(&self.pool)
			.await
			.map_err(|e| to_store_error(DbError::Sqlx(e)))?;
		let count: i64 = row.get("cnt");
		Ok(count as u64)
	}

	async fn delete(&self, filter: &AuditQuery) -> std::result::Result<u64, StoreError> {
		let (where_clause, binds) = filter_clauses(filter);
		let sql = format!("DELETE FROM audit_records WHERE {where_clause}");

		let mut query = sqlx::query(&sql);
		for bind in &binds {
			query = query.bind(bind);
		}

		let result = query
			.execute(&self.pool)
			.await
			.map_err(|e| to_store_error(DbError::Sqlx(e)))?;
		Ok(result.rows_affected())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_audit_test_pool;
	use cadence_server_audit::AuditRecordBuilder;
	use chrono::Duration;
	use serde_json::json;

	async fn repo() -> SqliteAuditRepository {
		SqliteAuditRepository::new(create_audit_test_pool().await)
	}

	#[tokio::test]
	async fn insert_and_find_roundtrip() {
		let repo = repo().await;
		let workspace = WorkspaceId::generate();
		let mut old = Map::new();
		old.insert("status".to_string(), json!("draft"));
		let mut new = Map::new();
		new.insert("status".to_string(), json!("approved"));

		let original = AuditRecordBuilder::new(ActionKind::StatusChanged)
			.auditable(AuditableRef::new("content_item", "42"))
			.workspace(workspace)
			.actor("user-7", UserType::Agency)
			.old_values(old)
			.new_values(new)
			.severity(AuditSeverity::Warning)
			.tag("workflow")
			.ip_address("10.0.0.1")
			.user_agent("curl/8.0")
			.session_id("sess-1")
			.build();

		repo.insert(&original).await.unwrap();
		let found = repo.find_by_id(original.id).await.unwrap().unwrap();

		assert_eq!(found.action, original.action);
		assert_eq!(found.auditable, original.auditable);
		assert_eq!(found.old_values, original.old_values);
		assert_eq!(found.new_values, original.new_values);
		assert_eq!(found.workspace_id, Some(workspace));
		assert_eq!(found.user_id, original.user_id);
		assert_eq!(found.user_type, UserType::Agency);
		assert_eq!(found.severity, AuditSeverity::Warning);
		assert_eq!(found.tags, original.tags);
		assert_eq!(found.ip_address, original.ip_address);
		assert_eq!(found.expires_at, original.expires_at);
		assert_eq!(found.created_at, original.created_at);
	}

	#[tokio::test]
	async fn duplicate_id_surfaces_conflict() {
		let repo = repo().await;
		let record = AuditRecordBuilder::new(ActionKind::Login).build();

		repo.insert(&record).await.unwrap();
		let err = repo.insert(&record).await.unwrap_err();
		assert!(matches!(err, StoreError::Conflict(_)));
	}

	#[tokio::test]
	async fn query_filters_by_action_and_workspace() {
		let repo = repo().await;
		let workspace = WorkspaceId::generate();

		repo.insert(
			&AuditRecordBuilder::new(ActionKind::Created)
				.workspace(workspace)
				.build(),
		)
		.await
		.unwrap();
		repo.insert(
			&AuditRecordBuilder::new(ActionKind::Deleted)
				.workspace(workspace)
				.build(),
		)
		.await
		.unwrap();
		repo.insert(&AuditRecordBuilder::new(ActionKind::Created).build())
			.await
			.unwrap();

		let filter = AuditQuery {
			workspace_id: Some(workspace),
			action: Some(ActionKind::Created),
			..AuditQuery::default()
		};
		let results = repo.query(&filter).await.unwrap();
		assert_eq!(results.len(), 1);
		assert_eq!(results[0].action, ActionKind::Created);
		assert_eq!(repo.count(&filter).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn query_orders_and_paginates() {
		let repo = repo().await;
		for _ in 0..5 {
			repo.insert(&AuditRecordBuilder::new(ActionKind::Login).build())
				.await
				.unwrap();
		}

		let newest = repo
			.query(&AuditQuery {
				limit: Some(2),
				..AuditQuery::default()
			})
			.await
			.unwrap();
		assert_eq!(newest.len(), 2);
		assert!(newest[0].created_at >= newest[1].created_at);

		let offset = repo
			.query(&AuditQuery {
				limit: Some(10),
				offset: Some(4),
				..AuditQuery::default()
			})
			.await
			.unwrap();
		assert_eq!(offset.len(), 1);
	}

	#[tokio::test]
	async fn severity_filter_uses_set_membership() {
		let repo = repo().await;
		repo.insert(
			&AuditRecordBuilder::new(ActionKind::Login)
				.severity(AuditSeverity::Debug)
				.build(),
		)
		.await
		.unwrap();
		repo.insert(
			&AuditRecordBuilder::new(ActionKind::Login)
				.severity(AuditSeverity::Critical)
				.build(),
		)
		.await
		.unwrap();

		let filter = AuditQuery {
			severities: Some(vec![AuditSeverity::Debug, AuditSeverity::Info]),
			..AuditQuery::default()
		};
		assert_eq!(repo.count(&filter).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn delete_removes_expired_records_only() {
		let repo = repo().await;
		repo.insert(
			&AuditRecordBuilder::new(ActionKind::Login)
				.expires_at(Utc::now() - Duration::days(1))
				.build(),
		)
		.await
		.unwrap();
		repo.insert(&AuditRecordBuilder::new(ActionKind::Login).build())
			.await
			.unwrap();

		let filter = AuditQuery {
			expired_as_of: Some(Utc::now()),
			..AuditQuery::default()
		};
		assert_eq!(repo.delete(&filter).await.unwrap(), 1);
		assert_eq!(repo.count(&AuditQuery::default()).await.unwrap(), 1);
		// A second sweep finds nothing.
		assert_eq!(repo.delete(&filter).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn auditable_filter_returns_entity_trail() {
		let repo = repo().await;
		repo.insert(
			&AuditRecordBuilder::new(ActionKind::Created)
				.auditable(AuditableRef::new("content_item", "1"))
				.build(),
		)
		.await
		.unwrap();
		repo.insert(
			&AuditRecordBuilder::new(ActionKind::Updated)
				.auditable(AuditableRef::new("content_item", "2"))
				.build(),
		)
		.await
		.unwrap();

		let results = repo
			.query(&AuditQuery::for_auditable("content_item", "1"))
			.await
			.unwrap();
		assert_eq!(results.len(), 1);
		assert_eq!(results[0].auditable.as_ref().unwrap().id, "1");
	}
}
