// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retention: the only component allowed to delete audit records.
//!
//! Nothing here schedules itself; an external scheduler decides when to run
//! and with which [`CleanupConfig`].

use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::Result;
use crate::record::{AuditRecord, AuditSeverity};
use crate::store::{AuditQuery, AuditRecordStore};

/// How urgently a recommendation should be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPriority {
	Low,
	Medium,
	High,
}

/// One suggested cleanup step, produced by
/// [`RetentionManager::cleanup_recommendations`].
#[derive(Debug, Clone, Serialize)]
pub struct CleanupRecommendation {
	pub priority: CleanupPriority,
	pub action: String,
	pub reason: String,
}

/// Result of [`RetentionManager::archive_old_logs`]: the snapshot taken and
/// how many rows the follow-up delete actually removed.
#[derive(Debug, Clone)]
pub struct ArchiveResult {
	pub archived_count: u64,
	pub deleted_count: u64,
	pub records: Vec<AuditRecord>,
}

/// Opt-in plan for [`RetentionManager::execute_cleanup`]. Absent fields mean
/// "skip that step".
#[derive(Debug, Clone, Default)]
pub struct CleanupConfig {
	/// Delete records past their retention expiry.
	pub delete_expired: bool,
	/// Delete records older than this many days.
	pub max_age_days: Option<i64>,
	/// Delete records at any of these severities.
	pub purge_severities: Option<Vec<AuditSeverity>>,
}

/// Per-step deletion counts from one [`RetentionManager::execute_cleanup`]
/// run. A `None` step was skipped, not empty.
#[derive(Debug, Clone, Default)]
pub struct CleanupResults {
	pub expired_deleted: Option<u64>,
	pub age_deleted: Option<u64>,
	pub severity_deleted: Option<u64>,
	pub total_deleted: u64,
}

const OLD_RECORDS_AGE_DAYS: i64 = 365;
const OLD_RECORDS_THRESHOLD: u64 = 1_000;
const DEBUG_RECORDS_THRESHOLD: u64 = 5_000;
const TOTAL_RECORDS_THRESHOLD: u64 = 100_000;

/// Deletes and archives audit records per retention policy.
#[derive(Clone)]
pub struct RetentionManager {
	store: Arc<dyn AuditRecordStore>,
}

impl RetentionManager {
	pub fn new(store: Arc<dyn AuditRecordStore>) -> Self {
		Self { store }
	}

	/// Delete every record whose retention expiry has passed. Idempotent.
	#[instrument(skip(self))]
	pub async fn cleanup_expired(&self) -> Result<u64> {
		let deleted = self
			.store
			.delete(&AuditQuery {
				expired_as_of: Some(Utc::now()),
				..AuditQuery::default()
			})
			.await?;
		info!(deleted, "expired audit records removed");
		Ok(deleted)
	}

	/// Delete every record created more than `days` days ago.
	#[instrument(skip(self))]
	pub async fn cleanup_by_age(&self, days: i64) -> Result<u64> {
		let deleted = self
			.store
			.delete(&AuditQuery {
				created_before: Some(Utc::now() - Duration::days(days)),
				..AuditQuery::default()
			})
			.await?;
		info!(deleted, days, "aged audit records removed");
		Ok(deleted)
	}

	/// Delete every record at any of the given severities, regardless of
	/// age. A blunt instrument; meant for purging debug noise, not for
	/// routine retention.
	#[instrument(skip(self))]
	pub async fn cleanup_by_severity(&self, severities: &[AuditSeverity]) -> Result<u64> {
		if severities.is_empty() {
			return Ok(0);
		}
		let deleted = self
			.store
			.delete(&AuditQuery {
				severities: Some(severities.to_vec()),
				..AuditQuery::default()
			})
			.await?;
		info!(deleted, ?severities, "audit records purged by severity");
		Ok(deleted)
	}

	/// Snapshot records older than `days` days, then delete them.
	///
	/// `deleted_count` reflects what the delete actually removed, which can
	/// differ from `archived_count` if rows changed between the two steps.
	#[instrument(skip(self))]
	pub async fn archive_old_logs(&self, days: i64) -> Result<ArchiveResult> {
		let cutoff = Utc::now() - Duration::days(days);
		let filter = AuditQuery {
			created_before: Some(cutoff),
			..AuditQuery::default()
		};

		let records = self.store.query(&filter).await?;
		let archived_count = records.len() as u64;
		let deleted_count = self.store.delete(&filter).await?;
		info!(archived_count, deleted_count, days, "audit records archived");

		Ok(ArchiveResult {
			archived_count,
			deleted_count,
			records,
		})
	}

	/// Inspect the trail and suggest cleanup steps, most urgent first.
	#[instrument(skip(self))]
	pub async fn cleanup_recommendations(&self) -> Result<Vec<CleanupRecommendation>> {
		let now = Utc::now();
		let mut recommendations = Vec::new();

		let expired = self
			.store
			.count(&AuditQuery {
				expired_as_of: Some(now),
				..AuditQuery::default()
			})
			.await?;
		if expired > 0 {
			recommendations.push(CleanupRecommendation {
				priority: CleanupPriority::High,
				action: "cleanup_expired".to_string(),
				reason: format!("{expired} records are past their retention expiry"),
			});
		}

		let old = self
			.store
			.count(&AuditQuery {
				created_before: Some(now - Duration::days(OLD_RECORDS_AGE_DAYS)),
				..AuditQuery::default()
			})
			.await?;
		if old > OLD_RECORDS_THRESHOLD {
			recommendations.push(CleanupRecommendation {
				priority: CleanupPriority::Medium,
				action: format!("cleanup_by_age({OLD_RECORDS_AGE_DAYS})"),
				reason: format!("{old} records are older than {OLD_RECORDS_AGE_DAYS} days"),
			});
		}

		let debug = self
			.store
			.count(&AuditQuery {
				severities: Some(vec![AuditSeverity::Debug]),
				..AuditQuery::default()
			})
			.await?;
		if debug > DEBUG_RECORDS_THRESHOLD {
			recommendations.push(CleanupRecommendation {
				priority: CleanupPriority::Low,
				action: "cleanup_by_severity([debug])".to_string(),
				reason: format!("{debug} debug records are padding the trail"),
			});
		}

		let total = self.store.count(&AuditQuery::default()).await?;
		if total > TOTAL_RECORDS_THRESHOLD {
			recommendations.push(CleanupRecommendation {
				priority: CleanupPriority::Medium,
				action: "archive_old_logs".to_string(),
				reason: format!("trail holds {total} records, table maintenance advised"),
			});
		}

		recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
		Ok(recommendations)
	}

	/// Run the opt-in cleanup steps in `config`, summing deletions.
	#[instrument(skip(self))]
	pub async fn execute_cleanup(&self, config: CleanupConfig) -> Result<CleanupResults> {
		let mut results = CleanupResults::default();

		if config.delete_expired {
			let deleted = self.cleanup_expired().await?;
			results.expired_deleted = Some(deleted);
			results.total_deleted += deleted;
		}

		if let Some(days) = config.max_age_days {
			let deleted = self.cleanup_by_age(days).await?;
			results.age_deleted = Some(deleted);
			results.total_deleted += deleted;
		}

		if let Some(severities) = &config.purge_severities {
			let deleted = self.cleanup_by_severity(severities).await?;
			results.severity_deleted = Some(deleted);
			results.total_deleted += deleted;
		}

		info!(total_deleted = results.total_deleted, "cleanup run complete");
		Ok(results)
	}
}
