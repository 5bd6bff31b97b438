// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-side reporting over the audit trail.
//!
//! The engine fetches windows of records through the store and aggregates in
//! memory. Reporting windows are bounded (days, not the whole table), so the
//! working set stays small; heavy-duty analytics belong in an external
//! warehouse, not here.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

use cadence_server_auth::UserType;

use crate::error::Result;
use crate::record::{ActionKind, AuditRecord};
use crate::store::{AuditQuery, AuditRecordStore};

/// How a field changed between the old and new snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
	Added,
	Removed,
	Modified,
	/// Present in both snapshots with equal values. Only
	/// [`AuditQueryEngine::field_change`] reports this; the diff map
	/// omits unchanged keys.
	Unchanged,
}

/// One field's before/after values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
	pub old: Option<Value>,
	pub new: Option<Value>,
	pub kind: ChangeKind,
}

/// Aggregate counts over a reporting window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditStatistics {
	pub total: u64,
	pub by_action: BTreeMap<String, u64>,
	pub by_severity: BTreeMap<String, u64>,
	pub by_user_type: BTreeMap<String, u64>,
	/// Keyed by UTC calendar day, `YYYY-MM-DD`.
	pub by_day: BTreeMap<String, u64>,
}

/// An actor's record count over a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserActivity {
	pub user_id: String,
	pub user_type: UserType,
	pub count: u64,
}

/// Failed-login volume from one source address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpActivity {
	pub ip_address: String,
	pub count: u64,
}

/// Deletion volume attributed to one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorActivity {
	pub user_id: String,
	pub user_type: UserType,
	pub count: u64,
}

/// Patterns worth a second look.
///
/// Each field is `None` when no group crossed its threshold: absent, not an
/// empty list, so serialized reports only mention categories that fired.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuspiciousActivity {
	/// IPs with more than 5 failed logins in the window.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub failed_logins: Option<Vec<IpActivity>>,
	/// Actors with more than 10 deletions in the window.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mass_deletions: Option<Vec<ActorActivity>>,
}

const FAILED_LOGIN_THRESHOLD: u64 = 5;
const MASS_DELETION_THRESHOLD: u64 = 10;

/// Query and aggregation facade over an [`AuditRecordStore`].
#[derive(Clone)]
pub struct AuditQueryEngine {
	store: Arc<dyn AuditRecordStore>,
}

impl AuditQueryEngine {
	pub fn new(store: Arc<dyn AuditRecordStore>) -> Self {
		Self { store }
	}

	/// Names of the fields that changed in a record, ascending.
	pub fn changed_fields(&self, record: &AuditRecord) -> Vec<String> {
		self.field_changes(record).into_keys().collect()
	}

	/// One named field's before/after detail, unchanged included.
	///
	/// `None` means the key appears in neither snapshot; a key held equal
	/// on both sides comes back as [`ChangeKind::Unchanged`] so callers
	/// can tell "did not change" apart from "was never recorded".
	pub fn field_change(&self, record: &AuditRecord, key: &str) -> Option<FieldChange> {
		let old = record.old_values.get(key);
		let new = record.new_values.get(key);
		let kind = match (old, new) {
			(None, None) => return None,
			(Some(o), Some(n)) if o == n => ChangeKind::Unchanged,
			(Some(_), Some(_)) => ChangeKind::Modified,
			(Some(_), None) => ChangeKind::Removed,
			(None, Some(_)) => ChangeKind::Added,
		};
		Some(FieldChange {
			old: old.cloned(),
			new: new.cloned(),
			kind,
		})
	}

	/// Per-field before/after detail for a record. Keys present in both
	/// snapshots with equal values are excluded.
	pub fn field_changes(&self, record: &AuditRecord) -> BTreeMap<String, FieldChange> {
		let mut changes = BTreeMap::new();

		for (key, old_value) in &record.old_values {
			match record.new_values.get(key) {
				Some(new_value) if new_value == old_value => {}
				Some(new_value) => {
					changes.insert(
						key.clone(),
						FieldChange {
							old: Some(old_value.clone()),
							new: Some(new_value.clone()),
							kind: ChangeKind::Modified,
						},
					);
				}
				None => {
					changes.insert(
						key.clone(),
						FieldChange {
							old: Some(old_value.clone()),
							new: None,
							kind: ChangeKind::Removed,
						},
					);
				}
			}
		}

		for (key, new_value) in &record.new_values {
			if !record.old_values.contains_key(key) {
				changes.insert(
					key.clone(),
					FieldChange {
						old: None,
						new: Some(new_value.clone()),
						kind: ChangeKind::Added,
					},
				);
			}
		}

		changes
	}

	/// Aggregate counts for records created in the last `days` days.
	#[instrument(skip(self))]
	pub async fn statistics(&self, days: i64) -> Result<AuditStatistics> {
		let records = self.store.query(&AuditQuery::last_days(days)).await?;

		let mut stats = AuditStatistics {
			total: records.len() as u64,
			..AuditStatistics::default()
		};
		for record in &records {
			*stats
				.by_action
				.entry(record.action.as_str().to_string())
				.or_insert(0) += 1;
			*stats
				.by_severity
				.entry(record.severity.as_str().to_string())
				.or_insert(0) += 1;
			*stats
				.by_user_type
				.entry(record.user_type.as_str().to_string())
				.or_insert(0) += 1;
			*stats
				.by_day
				.entry(record.created_at.format("%Y-%m-%d").to_string())
				.or_insert(0) += 1;
		}
		Ok(stats)
	}

	/// Actors ranked by record volume over the window: count descending,
	/// ties broken by `(user_id, user_type)` ascending.
	#[instrument(skip(self))]
	pub async fn most_active_users(&self, days: i64, limit: usize) -> Result<Vec<UserActivity>> {
		let records = self.store.query(&AuditQuery::last_days(days)).await?;

		let mut counts: BTreeMap<(String, UserType), u64> = BTreeMap::new();
		for record in &records {
			if let Some(user_id) = &record.user_id {
				*counts
					.entry((user_id.clone(), record.user_type))
					.or_insert(0) += 1;
			}
		}

		let mut activity: Vec<UserActivity> = counts
			.into_iter()
			.map(|((user_id, user_type), count)| UserActivity {
				user_id,
				user_type,
				count,
			})
			.collect();
		activity.sort_by(|a, b| {
			b.count
				.cmp(&a.count)
				.then_with(|| a.user_id.cmp(&b.user_id))
				.then_with(|| a.user_type.as_str().cmp(b.user_type.as_str()))
		});
		activity.truncate(limit);
		Ok(activity)
	}

	/// Every record about one entity, newest first.
	pub async fn model_audit_trail(
		&self,
		type_name: &str,
		entity_id: &str,
	) -> Result<Vec<AuditRecord>> {
		let records = self
			.store
			.query(&AuditQuery::for_auditable(type_name, entity_id))
			.await?;
		Ok(records)
	}

	/// The `limit` most recent records across the whole trail.
	pub async fn recent_activity(&self, limit: u64) -> Result<Vec<AuditRecord>> {
		let records = self
			.store
			.query(&AuditQuery::default().with_limit(limit))
			.await?;
		Ok(records)
	}

	/// Threshold scan for brute-force and mass-deletion patterns over the
	/// last `days` days.
	#[instrument(skip(self))]
	pub async fn find_suspicious_activity(&self, days: i64) -> Result<SuspiciousActivity> {
		let failed = self
			.store
			.query(&AuditQuery::last_days(days).with_action(ActionKind::LoginFailed))
			.await?;
		let mut by_ip: BTreeMap<String, u64> = BTreeMap::new();
		for record in &failed {
			if let Some(ip) = &record.ip_address {
				*by_ip.entry(ip.clone()).or_insert(0) += 1;
			}
		}
		let mut failed_logins: Vec<IpActivity> = by_ip
			.into_iter()
			.filter(|(_, count)| *count > FAILED_LOGIN_THRESHOLD)
			.map(|(ip_address, count)| IpActivity { ip_address, count })
			.collect();
		failed_logins.sort_by(|a, b| b.count.cmp(&a.count));

		let deletions = self
			.store
			.query(&AuditQuery::last_days(days).with_action(ActionKind::Deleted))
			.await?;
		let mut by_actor: BTreeMap<(String, UserType), u64> = BTreeMap::new();
		for record in &deletions {
			if let Some(user_id) = &record.user_id {
				*by_actor
					.entry((user_id.clone(), record.user_type))
					.or_insert(0) += 1;
			}
		}
		let mut mass_deletions: Vec<ActorActivity> = by_actor
			.into_iter()
			.filter(|(_, count)| *count > MASS_DELETION_THRESHOLD)
			.map(|((user_id, user_type), count)| ActorActivity {
				user_id,
				user_type,
				count,
			})
			.collect();
		mass_deletions.sort_by(|a, b| b.count.cmp(&a.count));

		Ok(SuspiciousActivity {
			failed_logins: if failed_logins.is_empty() {
				None
			} else {
				Some(failed_logins)
			},
			mass_deletions: if mass_deletions.is_empty() {
				None
			} else {
				Some(mass_deletions)
			},
		})
	}
}
