// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The single persistence funnel for audit records.
//!
//! Every convenience helper builds an [`AuditRecordBuilder`] and hands it to
//! [`AuditWriter::log`], so enrichment and persistence behave identically no
//! matter which entry point produced the record.
//!
//! Failure policy: security-relevant writes (`log_security_event`,
//! `log_unauthorized_access`, plain `log`) propagate store errors to the
//! caller. Model-change and operational writes are best effort; a failed
//! write is logged at `warn` and the caller proceeds.

use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use cadence_server_auth::RequestContext;

use crate::entity::AuditEntity;
use crate::enrichment::AuditEnricher;
use crate::error::Result;
use crate::record::{ActionKind, AuditRecord, AuditRecordBuilder, AuditSeverity};
use crate::store::AuditRecordStore;

/// External systems whose sync runs are audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
	Trello,
	Slack,
}

impl Integration {
	pub fn as_str(&self) -> &'static str {
		match self {
			Integration::Trello => "trello",
			Integration::Slack => "slack",
		}
	}

	fn action(&self) -> ActionKind {
		match self {
			Integration::Trello => ActionKind::TrelloSync,
			Integration::Slack => ActionKind::SlackSync,
		}
	}
}

impl fmt::Display for Integration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Outcome of one integration sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
	pub synced: u64,
	pub errors: Vec<String>,
}

/// Restrict `old` and `new` snapshots to the keys whose values differ.
/// Keys present in both with equal values are excluded from both sides.
fn snapshot_diff(
	old: &Map<String, Value>,
	new: &Map<String, Value>,
) -> (Map<String, Value>, Map<String, Value>) {
	let mut old_changed = Map::new();
	let mut new_changed = Map::new();

	for (key, old_value) in old {
		if new.get(key) != Some(old_value) {
			old_changed.insert(key.clone(), old_value.clone());
		}
	}
	for (key, new_value) in new {
		if old.get(key) != Some(new_value) {
			new_changed.insert(key.clone(), new_value.clone());
		}
	}

	(old_changed, new_changed)
}

/// Writes enriched audit records through an [`AuditRecordStore`].
#[derive(Clone)]
pub struct AuditWriter {
	store: Arc<dyn AuditRecordStore>,
	enricher: AuditEnricher,
}

impl AuditWriter {
	pub fn new(store: Arc<dyn AuditRecordStore>) -> Self {
		Self {
			store,
			enricher: AuditEnricher::new(),
		}
	}

	/// Enrich and persist a record. Store failures propagate.
	#[instrument(skip_all, fields(action = %builder.action))]
	pub async fn log(
		&self,
		builder: AuditRecordBuilder,
		ctx: &dyn RequestContext,
	) -> Result<AuditRecord> {
		let record = self.enricher.enrich(builder, ctx).build();
		self.store.insert(&record).await?;
		debug!(record_id = %record.id, action = %record.action, "audit record written");
		Ok(record)
	}

	/// Best-effort variant of [`log`](Self::log): store failures are logged
	/// and swallowed.
	async fn log_swallowed(
		&self,
		builder: AuditRecordBuilder,
		ctx: &dyn RequestContext,
	) -> Option<AuditRecord> {
		let action = builder.action;
		match self.log(builder, ctx).await {
			Ok(record) => Some(record),
			Err(err) => {
				warn!(action = %action, error = %err, "audit write failed, continuing");
				None
			}
		}
	}

	/// Record creation of an entity. Best effort.
	pub async fn log_model_created<E: AuditEntity + ?Sized>(
		&self,
		entity: &E,
		ctx: &dyn RequestContext,
	) -> Option<AuditRecord> {
		let mut builder = AuditRecordBuilder::new(ActionKind::Created)
			.auditable(entity.auditable_ref())
			.new_values(entity.audit_snapshot());
		if let Some(workspace_id) = entity.workspace_id() {
			builder = builder.workspace(workspace_id);
		}
		self.log_swallowed(builder, ctx).await
	}

	/// Record an update as the diff between `old_snapshot` and the entity's
	/// current snapshot. Unchanged keys are excluded from both sides; when
	/// nothing changed no record is written. Best effort.
	pub async fn log_model_updated<E: AuditEntity + ?Sized>(
		&self,
		entity: &E,
		old_snapshot: Map<String, Value>,
		ctx: &dyn RequestContext,
	) -> Option<AuditRecord> {
		let (old_changed, new_changed) = snapshot_diff(&old_snapshot, &entity.audit_snapshot());
		if old_changed.is_empty() && new_changed.is_empty() {
			debug!(
				auditable = %entity.auditable_ref(),
				"update produced no field changes, skipping audit record"
			);
			return None;
		}

		let mut builder = AuditRecordBuilder::new(ActionKind::Updated)
			.auditable(entity.auditable_ref())
			.old_values(old_changed)
			.new_values(new_changed);
		if let Some(workspace_id) = entity.workspace_id() {
			builder = builder.workspace(workspace_id);
		}
		self.log_swallowed(builder, ctx).await
	}

	/// Record deletion of an entity, preserving its final snapshot. Best
	/// effort.
	pub async fn log_model_deleted<E: AuditEntity + ?Sized>(
		&self,
		entity: &E,
		ctx: &dyn RequestContext,
	) -> Option<AuditRecord> {
		let mut builder = AuditRecordBuilder::new(ActionKind::Deleted)
			.auditable(entity.auditable_ref())
			.old_values(entity.audit_snapshot());
		if let Some(workspace_id) = entity.workspace_id() {
			builder = builder.workspace(workspace_id);
		}
		self.log_swallowed(builder, ctx).await
	}

	/// Record a security-relevant event. Store failures propagate: losing
	/// these records is worse than failing the operation that caused them.
	#[instrument(skip_all, fields(action = %action, severity = %severity))]
	pub async fn log_security_event(
		&self,
		action: ActionKind,
		severity: AuditSeverity,
		details: Map<String, Value>,
		ctx: &dyn RequestContext,
	) -> Result<AuditRecord> {
		let builder = AuditRecordBuilder::new(action)
			.severity(severity)
			.new_values(details)
			.tag("security");
		self.log(builder, ctx).await
	}

	/// Record a denied access attempt. Store failures propagate.
	pub async fn log_unauthorized_access(
		&self,
		resource: &str,
		attempted_action: &str,
		ctx: &dyn RequestContext,
	) -> Result<AuditRecord> {
		let mut details = Map::new();
		details.insert("resource".to_string(), json!(resource));
		details.insert("attempted_action".to_string(), json!(attempted_action));
		self.log_security_event(
			ActionKind::UnauthorizedAccess,
			AuditSeverity::Warning,
			details,
			ctx,
		)
		.await
	}

	/// Record a data export with the filters used and the row count
	/// returned. Best effort.
	pub async fn log_data_export(
		&self,
		export_type: &str,
		filters: Map<String, Value>,
		result_count: u64,
		ctx: &dyn RequestContext,
	) -> Option<AuditRecord> {
		let mut details = Map::new();
		details.insert("export_type".to_string(), json!(export_type));
		details.insert("filters".to_string(), Value::Object(filters));
		details.insert("result_count".to_string(), json!(result_count));

		let builder = AuditRecordBuilder::new(ActionKind::DataExported)
			.new_values(details)
			.tag("export");
		self.log_swallowed(builder, ctx).await
	}

	/// Record an integration sync run. Any sync errors escalate the record
	/// to `warning`. Best effort.
	pub async fn log_sync_operation(
		&self,
		integration: Integration,
		operation: &str,
		result: &SyncResult,
		ctx: &dyn RequestContext,
	) -> Option<AuditRecord> {
		let severity = if result.errors.is_empty() {
			AuditSeverity::Info
		} else {
			AuditSeverity::Warning
		};

		let mut details = Map::new();
		details.insert("integration".to_string(), json!(integration.as_str()));
		details.insert("operation".to_string(), json!(operation));
		details.insert("synced_count".to_string(), json!(result.synced));
		details.insert("errors".to_string(), json!(result.errors));

		let builder = AuditRecordBuilder::new(integration.action())
			.severity(severity)
			.new_values(details)
			.tag("sync");
		self.log_swallowed(builder, ctx).await
	}
}
