// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only audit trail engine for Cadence.
//!
//! The write path funnels through [`AuditWriter`]: callers describe what
//! happened, the [`AuditEnricher`] fills in actor and request context from
//! the ambient [`RequestContext`](cadence_server_auth::RequestContext), and
//! the record lands in an [`AuditRecordStore`]. The read path is
//! [`AuditQueryEngine`] (diffs, statistics, suspicious-activity scans) and
//! deletion is owned exclusively by [`RetentionManager`].

pub mod enrichment;
pub mod entity;
pub mod error;
pub mod query;
pub mod record;
pub mod redaction;
pub mod retention;
pub mod store;
pub mod testing;
pub mod writer;

pub use enrichment::AuditEnricher;
pub use entity::AuditEntity;
pub use error::{AuditError, Result, StoreError};
pub use query::{
	ActorActivity, AuditQueryEngine, AuditStatistics, ChangeKind, FieldChange, IpActivity,
	SuspiciousActivity, UserActivity,
};
pub use record::{
	ActionKind, AuditRecord, AuditRecordBuilder, AuditRecordId, AuditSeverity, AuditableRef,
	DEFAULT_AUDIT_RETENTION_DAYS,
};
pub use redaction::{MAX_PAYLOAD_BYTES, REDACTED_PLACEHOLDER};
pub use retention::{
	ArchiveResult, CleanupConfig, CleanupPriority, CleanupRecommendation, CleanupResults,
	RetentionManager,
};
pub use store::{AuditQuery, AuditRecordStore, QueryOrder};
pub use writer::{AuditWriter, Integration, SyncResult};
