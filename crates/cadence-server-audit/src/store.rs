// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage abstraction for audit records.
//!
//! The store is deliberately narrow: insert, point lookup, filtered reads,
//! and filtered deletes. There is no update operation; the trail is
//! append-only and the only mutation is retention deletion.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cadence_server_auth::{UserType, WorkspaceId};

use crate::error::StoreError;
use crate::record::{ActionKind, AuditRecord, AuditRecordId, AuditSeverity, AuditableRef};

/// Read ordering for [`AuditQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOrder {
	#[default]
	NewestFirst,
	OldestFirst,
}

/// Filter for reads and deletes.
///
/// All criteria are conjunctive; `None` means "no constraint". The same
/// struct drives `query`, `count`, and `delete` so retention and reporting
/// agree on what a criterion means.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
	pub workspace_id: Option<WorkspaceId>,
	pub action: Option<ActionKind>,
	pub severities: Option<Vec<AuditSeverity>>,
	pub user_id: Option<String>,
	pub user_type: Option<UserType>,
	pub auditable: Option<AuditableRef>,
	pub created_after: Option<DateTime<Utc>>,
	pub created_before: Option<DateTime<Utc>>,
	/// Matches records whose retention expiry is at or before this instant.
	pub expired_as_of: Option<DateTime<Utc>>,
	pub order: QueryOrder,
	pub limit: Option<u64>,
	pub offset: Option<u64>,
}

impl AuditQuery {
	/// Records created in the last `days` days.
	pub fn last_days(days: i64) -> Self {
		Self {
			created_after: Some(Utc::now() - chrono::Duration::days(days)),
			..Self::default()
		}
	}

	/// Records about one entity.
	pub fn for_auditable(type_name: impl Into<String>, id: impl Into<String>) -> Self {
		Self {
			auditable: Some(AuditableRef::new(type_name, id)),
			..Self::default()
		}
	}

	pub fn with_action(mut self, action: ActionKind) -> Self {
		self.action = Some(action);
		self
	}

	pub fn with_limit(mut self, limit: u64) -> Self {
		self.limit = Some(limit);
		self
	}

	/// True when `record` satisfies every set criterion, ignoring ordering
	/// and pagination. Shared by in-memory stores and kept here so the SQL
	/// repositories have a single reference semantics to mirror.
	pub fn matches(&self, record: &AuditRecord) -> bool {
		if let Some(workspace_id) = self.workspace_id {
			if record.workspace_id != Some(workspace_id) {
				return false;
			}
		}
		if let Some(action) = self.action {
			if record.action != action {
				return false;
			}
		}
		if let Some(severities) = &self.severities {
			if !severities.contains(&record.severity) {
				return false;
			}
		}
		if let Some(user_id) = &self.user_id {
			if record.user_id.as_ref() != Some(user_id) {
				return false;
			}
		}
		if let Some(user_type) = self.user_type {
			if record.user_type != user_type {
				return false;
			}
		}
		if let Some(auditable) = &self.auditable {
			if record.auditable.as_ref() != Some(auditable) {
				return false;
			}
		}
		if let Some(created_after) = self.created_after {
			if record.created_at < created_after {
				return false;
			}
		}
		if let Some(created_before) = self.created_before {
			if record.created_at >= created_before {
				return false;
			}
		}
		if let Some(expired_as_of) = self.expired_as_of {
			match record.expires_at {
				Some(expires_at) if expires_at <= expired_as_of => {}
				_ => return false,
			}
		}
		true
	}
}

/// Append-only persistence for audit records.
#[async_trait]
pub trait AuditRecordStore: Send + Sync {
	/// Persist a new record. Inserting an existing id is a
	/// [`StoreError::Conflict`]; records are never overwritten.
	async fn insert(&self, record: &AuditRecord) -> Result<(), StoreError>;

	async fn find_by_id(&self, id: AuditRecordId) -> Result<Option<AuditRecord>, StoreError>;

	/// Filtered read honoring order, limit, and offset.
	async fn query(&self, filter: &AuditQuery) -> Result<Vec<AuditRecord>, StoreError>;

	/// Count of records matching the filter, ignoring pagination.
	async fn count(&self, filter: &AuditQuery) -> Result<u64, StoreError>;

	/// Delete every record matching the filter, ignoring pagination.
	/// Returns the number of rows removed. Retention's only entry point.
	async fn delete(&self, filter: &AuditQuery) -> Result<u64, StoreError>;
}
