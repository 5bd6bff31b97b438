// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core record types for the audit trail: the closed [`ActionKind`]
//! enumeration, ordinal [`AuditSeverity`] levels, the append-only
//! [`AuditRecord`], and its fluent builder.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use cadence_server_auth::{UserType, WorkspaceId};

/// Default retention period for audit records in days.
///
/// Applied at write time: a record without an explicit expiry gets
/// `created_at + 90 days`. Retention cleanup deletes on that horizon.
pub const DEFAULT_AUDIT_RETENTION_DAYS: i64 = 90;

// =============================================================================
// ActionKind
// =============================================================================

/// Actions that can be recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
	// Model mutations
	Created,
	Updated,
	Deleted,
	StatusChanged,

	// Magic-link lifecycle
	MagicLinkIssued,
	MagicLinkAccessed,
	MagicLinkRevoked,
	MagicLinkRejected,

	// Authentication events
	Login,
	Logout,
	LoginFailed,

	// Access control events
	UnauthorizedAccess,

	// Data egress
	DataExported,

	// Integration syncs
	TrelloSync,
	SlackSync,
}

impl ActionKind {
	/// Stable string form, matching the serde representation.
	pub fn as_str(&self) -> &'static str {
		match self {
			ActionKind::Created => "created",
			ActionKind::Updated => "updated",
			ActionKind::Deleted => "deleted",
			ActionKind::StatusChanged => "status_changed",
			ActionKind::MagicLinkIssued => "magic_link_issued",
			ActionKind::MagicLinkAccessed => "magic_link_accessed",
			ActionKind::MagicLinkRevoked => "magic_link_revoked",
			ActionKind::MagicLinkRejected => "magic_link_rejected",
			ActionKind::Login => "login",
			ActionKind::Logout => "logout",
			ActionKind::LoginFailed => "login_failed",
			ActionKind::UnauthorizedAccess => "unauthorized_access",
			ActionKind::DataExported => "data_exported",
			ActionKind::TrelloSync => "trello_sync",
			ActionKind::SlackSync => "slack_sync",
		}
	}

	/// Parse the stable string form.
	pub fn parse(s: &str) -> Option<ActionKind> {
		match s {
			"created" => Some(ActionKind::Created),
			"updated" => Some(ActionKind::Updated),
			"deleted" => Some(ActionKind::Deleted),
			"status_changed" => Some(ActionKind::StatusChanged),
			"magic_link_issued" => Some(ActionKind::MagicLinkIssued),
			"magic_link_accessed" => Some(ActionKind::MagicLinkAccessed),
			"magic_link_revoked" => Some(ActionKind::MagicLinkRevoked),
			"magic_link_rejected" => Some(ActionKind::MagicLinkRejected),
			"login" => Some(ActionKind::Login),
			"logout" => Some(ActionKind::Logout),
			"login_failed" => Some(ActionKind::LoginFailed),
			"unauthorized_access" => Some(ActionKind::UnauthorizedAccess),
			"data_exported" => Some(ActionKind::DataExported),
			"trello_sync" => Some(ActionKind::TrelloSync),
			"slack_sync" => Some(ActionKind::SlackSync),
			_ => None,
		}
	}

	/// Returns all action kinds.
	pub fn all() -> &'static [ActionKind] {
		&[
			ActionKind::Created,
			ActionKind::Updated,
			ActionKind::Deleted,
			ActionKind::StatusChanged,
			ActionKind::MagicLinkIssued,
			ActionKind::MagicLinkAccessed,
			ActionKind::MagicLinkRevoked,
			ActionKind::MagicLinkRejected,
			ActionKind::Login,
			ActionKind::Logout,
			ActionKind::LoginFailed,
			ActionKind::UnauthorizedAccess,
			ActionKind::DataExported,
			ActionKind::TrelloSync,
			ActionKind::SlackSync,
		]
	}
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

// =============================================================================
// AuditSeverity
// =============================================================================

/// Severity levels for audit records.
///
/// The ordering is ordinal: `Debug < Info < Warning < Error < Critical`.
/// Retention policy treats the lower levels as expendable noise.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
	Debug,
	#[default]
	Info,
	Warning,
	Error,
	Critical,
}

impl AuditSeverity {
	/// Returns all severity levels from least to most severe.
	pub fn all() -> &'static [AuditSeverity] {
		&[
			AuditSeverity::Debug,
			AuditSeverity::Info,
			AuditSeverity::Warning,
			AuditSeverity::Error,
			AuditSeverity::Critical,
		]
	}

	/// Stable string form, matching the serde representation.
	pub fn as_str(&self) -> &'static str {
		match self {
			AuditSeverity::Debug => "debug",
			AuditSeverity::Info => "info",
			AuditSeverity::Warning => "warning",
			AuditSeverity::Error => "error",
			AuditSeverity::Critical => "critical",
		}
	}

	/// Parse the stable string form.
	pub fn parse(s: &str) -> Option<AuditSeverity> {
		match s {
			"debug" => Some(AuditSeverity::Debug),
			"info" => Some(AuditSeverity::Info),
			"warning" => Some(AuditSeverity::Warning),
			"error" => Some(AuditSeverity::Error),
			"critical" => Some(AuditSeverity::Critical),
			_ => None,
		}
	}
}

impl fmt::Display for AuditSeverity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

// =============================================================================
// AuditRecordId
// =============================================================================

/// A unique identifier for an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditRecordId(Uuid);

impl AuditRecordId {
	pub fn new(id: Uuid) -> Self {
		Self(id)
	}

	pub fn generate() -> Self {
		Self(Uuid::new_v4())
	}

	pub fn into_inner(self) -> Uuid {
		self.0
	}

	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl fmt::Display for AuditRecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<Uuid> for AuditRecordId {
	fn from(id: Uuid) -> Self {
		Self(id)
	}
}

impl From<AuditRecordId> for Uuid {
	fn from(id: AuditRecordId) -> Self {
		id.0
	}
}

// =============================================================================
// AuditableRef
// =============================================================================

/// Reference to the entity an audit record is about.
///
/// A plain `(type name, id)` pair rather than a runtime type dispatch: the
/// audit trail outlives any given entity and must stay readable after schema
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditableRef {
	pub type_name: String,
	pub id: String,
}

impl AuditableRef {
	pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
		Self {
			type_name: type_name.into(),
			id: id.into(),
		}
	}
}

impl fmt::Display for AuditableRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.type_name, self.id)
	}
}

// =============================================================================
// AuditRecord
// =============================================================================

/// An append-only record of one action, its actor, its effect, and its
/// context.
///
/// Records are created exactly once and never updated; corrections are new
/// records. Only the retention manager deletes rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
	pub id: AuditRecordId,
	pub action: ActionKind,
	/// The entity affected, if the action concerns one.
	pub auditable: Option<AuditableRef>,
	/// Entity snapshots. Both empty for non-diff events.
	pub old_values: Map<String, Value>,
	pub new_values: Map<String, Value>,
	pub workspace_id: Option<WorkspaceId>,
	/// Stringified actor id: a user id, or a magic-link id for link bearers.
	pub user_id: Option<String>,
	pub user_type: UserType,
	pub severity: AuditSeverity,
	/// Free-form classification tags (`security`, `export`, ...).
	pub tags: BTreeSet<String>,
	/// Captured request metadata (url, method, redacted input).
	pub request_data: Option<Map<String, Value>>,
	pub response_data: Option<Map<String, Value>>,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	pub session_id: Option<String>,
	/// When this record becomes eligible for retention deletion.
	pub expires_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
}

impl AuditRecord {
	/// Create a new builder for the given action.
	pub fn builder(action: ActionKind) -> AuditRecordBuilder {
		AuditRecordBuilder::new(action)
	}

	/// True when the record carries no entity diff (access/security/sync
	/// events rather than model mutations).
	pub fn is_non_diff_event(&self) -> bool {
		self.old_values.is_empty() && self.new_values.is_empty()
	}
}

// =============================================================================
// AuditRecordBuilder
// =============================================================================

/// Builder for constructing audit records with a fluent API.
///
/// Fields are crate-visible so the enricher can fill only what the caller
/// left unset.
#[derive(Debug, Clone)]
pub struct AuditRecordBuilder {
	pub(crate) action: ActionKind,
	pub(crate) auditable: Option<AuditableRef>,
	pub(crate) old_values: Map<String, Value>,
	pub(crate) new_values: Map<String, Value>,
	pub(crate) workspace_id: Option<WorkspaceId>,
	pub(crate) user_id: Option<String>,
	pub(crate) user_type: UserType,
	pub(crate) severity: AuditSeverity,
	pub(crate) tags: BTreeSet<String>,
	pub(crate) request_data: Option<Map<String, Value>>,
	pub(crate) response_data: Option<Map<String, Value>>,
	pub(crate) ip_address: Option<String>,
	pub(crate) user_agent: Option<String>,
	pub(crate) session_id: Option<String>,
	pub(crate) expires_at: Option<DateTime<Utc>>,
	pub(crate) retention_days: Option<i64>,
}

impl AuditRecordBuilder {
	/// Create a new builder for the given action.
	pub fn new(action: ActionKind) -> Self {
		Self {
			action,
			auditable: None,
			old_values: Map::new(),
			new_values: Map::new(),
			workspace_id: None,
			user_id: None,
			user_type: UserType::Anonymous,
			severity: AuditSeverity::Info,
			tags: BTreeSet::new(),
			request_data: None,
			response_data: None,
			ip_address: None,
			user_agent: None,
			session_id: None,
			expires_at: None,
			retention_days: None,
		}
	}

	pub fn auditable(mut self, auditable: AuditableRef) -> Self {
		self.auditable = Some(auditable);
		self
	}

	pub fn old_values(mut self, values: Map<String, Value>) -> Self {
		self.old_values = values;
		self
	}

	pub fn new_values(mut self, values: Map<String, Value>) -> Self {
		self.new_values = values;
		self
	}

	pub fn workspace(mut self, workspace_id: WorkspaceId) -> Self {
		self.workspace_id = Some(workspace_id);
		self
	}

	pub fn actor(mut self, user_id: impl Into<String>, user_type: UserType) -> Self {
		self.user_id = Some(user_id.into());
		self.user_type = user_type;
		self
	}

	/// Set the attribution classification without an actor id.
	pub fn user_type(mut self, user_type: UserType) -> Self {
		self.user_type = user_type;
		self
	}

	/// Set the severity level. Defaults to `Info`.
	pub fn severity(mut self, severity: AuditSeverity) -> Self {
		self.severity = severity;
		self
	}

	/// Add a classification tag.
	pub fn tag(mut self, tag: impl Into<String>) -> Self {
		self.tags.insert(tag.into());
		self
	}

	pub fn request_data(mut self, data: Map<String, Value>) -> Self {
		self.request_data = Some(data);
		self
	}

	pub fn response_data(mut self, data: Map<String, Value>) -> Self {
		self.response_data = Some(data);
		self
	}

	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
		self.session_id = Some(session_id.into());
		self
	}

	/// Pin an explicit retention expiry.
	pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
		self.expires_at = Some(expires_at);
		self
	}

	/// Override the retention window, relative to the write time.
	pub fn retain_for_days(mut self, days: i64) -> Self {
		self.retention_days = Some(days);
		self
	}

	pub(crate) fn has_actor(&self) -> bool {
		self.user_id.is_some() || self.user_type != UserType::Anonymous
	}

	pub(crate) fn has_workspace(&self) -> bool {
		self.workspace_id.is_some()
	}

	pub(crate) fn has_request_data(&self) -> bool {
		self.request_data.is_some()
	}

	/// Build the record.
	///
	/// `created_at` is set to now; the retention expiry defaults to
	/// [`DEFAULT_AUDIT_RETENTION_DAYS`] past that unless pinned explicitly.
	pub fn build(self) -> AuditRecord {
		let created_at = Utc::now();
		let expires_at = self.expires_at.or_else(|| {
			let days = self.retention_days.unwrap_or(DEFAULT_AUDIT_RETENTION_DAYS);
			Some(created_at + Duration::days(days))
		});

		AuditRecord {
			id: AuditRecordId::generate(),
			action: self.action,
			auditable: self.auditable,
			old_values: self.old_values,
			new_values: self.new_values,
			workspace_id: self.workspace_id,
			user_id: self.user_id,
			user_type: self.user_type,
			severity: self.severity,
			tags: self.tags,
			request_data: self.request_data,
			response_data: self.response_data,
			ip_address: self.ip_address,
			user_agent: self.user_agent,
			session_id: self.session_id,
			expires_at,
			created_at,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	mod action_kind {
		use super::*;

		#[test]
		fn display_returns_snake_case() {
			assert_eq!(ActionKind::Created.to_string(), "created");
			assert_eq!(
				ActionKind::MagicLinkAccessed.to_string(),
				"magic_link_accessed"
			);
			assert_eq!(ActionKind::LoginFailed.to_string(), "login_failed");
			assert_eq!(ActionKind::TrelloSync.to_string(), "trello_sync");
		}

		#[test]
		fn serializes_snake_case() {
			let json = serde_json::to_string(&ActionKind::UnauthorizedAccess).unwrap();
			assert_eq!(json, "\"unauthorized_access\"");
		}

		#[test]
		fn parse_roundtrips_all() {
			for action in ActionKind::all() {
				assert_eq!(ActionKind::parse(action.as_str()), Some(*action));
			}
			assert_eq!(ActionKind::parse("restored"), None);
		}

		#[test]
		fn all_action_kinds_serialize_deserialize() {
			for action in ActionKind::all() {
				let json = serde_json::to_string(action).unwrap();
				let roundtrip: ActionKind = serde_json::from_str(&json).unwrap();
				assert_eq!(*action, roundtrip);
			}
		}
	}

	mod audit_severity {
		use super::*;

		#[test]
		fn ordering_is_ordinal() {
			assert!(AuditSeverity::Debug < AuditSeverity::Info);
			assert!(AuditSeverity::Info < AuditSeverity::Warning);
			assert!(AuditSeverity::Warning < AuditSeverity::Error);
			assert!(AuditSeverity::Error < AuditSeverity::Critical);
		}

		#[test]
		fn default_is_info() {
			assert_eq!(AuditSeverity::default(), AuditSeverity::Info);
		}

		#[test]
		fn all_returns_ascending() {
			let all = AuditSeverity::all();
			assert_eq!(all.len(), 5);
			for i in 0..all.len() - 1 {
				assert!(all[i] < all[i + 1]);
			}
		}

		#[test]
		fn parse_roundtrips_all() {
			for severity in AuditSeverity::all() {
				assert_eq!(AuditSeverity::parse(severity.as_str()), Some(*severity));
			}
			assert_eq!(AuditSeverity::parse("notice"), None);
		}

		#[test]
		fn serializes_snake_case() {
			assert_eq!(
				serde_json::to_string(&AuditSeverity::Warning).unwrap(),
				"\"warning\""
			);
		}
	}

	mod audit_record_builder {
		use super::*;
		use cadence_server_auth::UserType;

		#[test]
		fn builds_minimal_record() {
			let record = AuditRecordBuilder::new(ActionKind::Login).build();

			assert_eq!(record.action, ActionKind::Login);
			assert_eq!(record.severity, AuditSeverity::Info);
			assert_eq!(record.user_type, UserType::Anonymous);
			assert!(record.user_id.is_none());
			assert!(record.auditable.is_none());
			assert!(record.old_values.is_empty());
			assert!(record.new_values.is_empty());
			assert!(record.is_non_diff_event());
			assert!(record.tags.is_empty());
		}

		#[test]
		fn default_expiry_is_90_days_past_creation() {
			let record = AuditRecordBuilder::new(ActionKind::Created).build();
			let expires_at = record.expires_at.expect("default expiry");
			assert_eq!(
				expires_at - record.created_at,
				Duration::days(DEFAULT_AUDIT_RETENTION_DAYS)
			);
		}

		#[test]
		fn retain_for_days_overrides_default_window() {
			let record = AuditRecordBuilder::new(ActionKind::Created)
				.retain_for_days(7)
				.build();
			let expires_at = record.expires_at.unwrap();
			assert_eq!(expires_at - record.created_at, Duration::days(7));
		}

		#[test]
		fn explicit_expiry_wins() {
			let pinned = Utc::now() + Duration::days(365);
			let record = AuditRecordBuilder::new(ActionKind::Created)
				.expires_at(pinned)
				.build();
			assert_eq!(record.expires_at, Some(pinned));
		}

		#[test]
		fn builds_full_record() {
			let workspace = WorkspaceId::generate();
			let mut old = Map::new();
			old.insert("status".to_string(), json!("draft"));
			let mut new = Map::new();
			new.insert("status".to_string(), json!("approved"));

			let record = AuditRecordBuilder::new(ActionKind::StatusChanged)
				.auditable(AuditableRef::new("content_item", "42"))
				.workspace(workspace)
				.actor("user-7", UserType::Agency)
				.old_values(old)
				.new_values(new)
				.severity(AuditSeverity::Warning)
				.tag("workflow")
				.ip_address("10.0.0.1")
				.user_agent("Mozilla/5.0")
				.session_id("sess-1")
				.build();

			assert_eq!(record.action, ActionKind::StatusChanged);
			assert_eq!(
				record.auditable,
				Some(AuditableRef::new("content_item", "42"))
			);
			assert_eq!(record.workspace_id, Some(workspace));
			assert_eq!(record.user_id, Some("user-7".to_string()));
			assert_eq!(record.user_type, UserType::Agency);
			assert_eq!(record.severity, AuditSeverity::Warning);
			assert!(record.tags.contains("workflow"));
			assert!(!record.is_non_diff_event());
			assert_eq!(record.ip_address, Some("10.0.0.1".to_string()));
			assert_eq!(record.session_id, Some("sess-1".to_string()));
		}

		#[test]
		fn generates_unique_ids() {
			let a = AuditRecordBuilder::new(ActionKind::Login).build();
			let b = AuditRecordBuilder::new(ActionKind::Login).build();
			assert_ne!(a.id, b.id);
		}

		#[test]
		fn sets_created_at_to_now() {
			let before = Utc::now();
			let record = AuditRecordBuilder::new(ActionKind::Login).build();
			let after = Utc::now();
			assert!(record.created_at >= before);
			assert!(record.created_at <= after);
		}
	}

	mod serialization {
		use super::*;

		#[test]
		fn record_serde_roundtrip() {
			let original = AuditRecordBuilder::new(ActionKind::MagicLinkAccessed)
				.actor("link-1", UserType::MagicLink)
				.workspace(WorkspaceId::generate())
				.tag("security")
				.build();

			let json = serde_json::to_string(&original).unwrap();
			let restored: AuditRecord = serde_json::from_str(&json).unwrap();
			assert_eq!(restored, original);
		}

		#[test]
		fn auditable_ref_display() {
			let r = AuditableRef::new("content_item", "17");
			assert_eq!(r.to_string(), "content_item#17");
		}
	}
}

#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;

	fn arb_severity() -> impl Strategy<Value = AuditSeverity> {
		prop_oneof![
			Just(AuditSeverity::Debug),
			Just(AuditSeverity::Info),
			Just(AuditSeverity::Warning),
			Just(AuditSeverity::Error),
			Just(AuditSeverity::Critical),
		]
	}

	proptest! {
			#[test]
			fn severity_ordering_is_total(a in arb_severity(), b in arb_severity()) {
					prop_assert!(a <= b || b <= a);
			}

			#[test]
			fn severity_serde_roundtrip(severity in arb_severity()) {
					let json = serde_json::to_string(&severity).unwrap();
					let roundtrip: AuditSeverity = serde_json::from_str(&json).unwrap();
					prop_assert_eq!(severity, roundtrip);
			}

			#[test]
			fn retention_expiry_never_precedes_creation(days in 0i64..3650) {
					let record = AuditRecordBuilder::new(ActionKind::Created)
							.retain_for_days(days)
							.build();
					prop_assert!(record.expires_at.unwrap() >= record.created_at);
			}
	}
}
