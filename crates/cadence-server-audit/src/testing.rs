// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory store implementations for tests.
//!
//! A regular (non-`cfg(test)`) module so dependent crates can drive the
//! writer and query engine without a database.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::record::{AuditRecord, AuditRecordId};
use crate::store::{AuditQuery, AuditRecordStore, QueryOrder};

/// Vec-backed [`AuditRecordStore`].
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
	records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every stored record, insertion order.
	pub fn all(&self) -> Vec<AuditRecord> {
		self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}

	pub fn len(&self) -> usize {
		self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AuditRecord>> {
		self.records.lock().unwrap_or_else(|e| e.into_inner())
	}
}

#[async_trait]
impl AuditRecordStore for MemoryAuditStore {
	async fn insert(&self, record: &AuditRecord) -> Result<(), StoreError> {
		let mut records = self.lock();
		if records.iter().any(|r| r.id == record.id) {
			return Err(StoreError::Conflict(format!(
				"audit record {} already exists",
				record.id
			)));
		}
		records.push(record.clone());
		Ok(())
	}

	async fn find_by_id(&self, id: AuditRecordId) -> Result<Option<AuditRecord>, StoreError> {
		Ok(self.lock().iter().find(|r| r.id == id).cloned())
	}

	async fn query(&self, filter: &AuditQuery) -> Result<Vec<AuditRecord>, StoreError> {
		let mut matched: Vec<AuditRecord> = self
			.lock()
			.iter()
			.filter(|r| filter.matches(r))
			.cloned()
			.collect();

		match filter.order {
			QueryOrder::NewestFirst => {
				matched.sort_by(|a, b| b.created_at.cmp(&a.created_at))
			}
			QueryOrder::OldestFirst => {
				matched.sort_by(|a, b| a.created_at.cmp(&b.created_at))
			}
		}

		let offset = filter.offset.unwrap_or(0) as usize;
		let matched: Vec<AuditRecord> = match filter.limit {
			Some(limit) => matched.into_iter().skip(offset).take(limit as usize).collect(),
			None => matched.into_iter().skip(offset).collect(),
		};
		Ok(matched)
	}

	async fn count(&self, filter: &AuditQuery) -> Result<u64, StoreError> {
		Ok(self.lock().iter().filter(|r| filter.matches(r)).count() as u64)
	}

	async fn delete(&self, filter: &AuditQuery) -> Result<u64, StoreError> {
		let mut records = self.lock();
		let before = records.len();
		records.retain(|r| !filter.matches(r));
		Ok((before - records.len()) as u64)
	}
}

/// Store whose writes fail after a configurable number of successes.
/// Exercises the swallow-versus-propagate split in the writer.
#[derive(Debug)]
pub struct FailingAuditStore {
	inner: MemoryAuditStore,
	successes_allowed: AtomicUsize,
}

impl FailingAuditStore {
	/// Fails every insert.
	pub fn new() -> Self {
		Self::failing_after(0)
	}

	/// Allows `n` inserts to succeed, then fails the rest.
	pub fn failing_after(n: usize) -> Self {
		Self {
			inner: MemoryAuditStore::new(),
			successes_allowed: AtomicUsize::new(n),
		}
	}

	pub fn all(&self) -> Vec<AuditRecord> {
		self.inner.all()
	}
}

impl Default for FailingAuditStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl AuditRecordStore for FailingAuditStore {
	async fn insert(&self, record: &AuditRecord) -> Result<(), StoreError> {
		let remaining = self.successes_allowed.load(Ordering::SeqCst);
		if remaining == 0 {
			return Err(StoreError::Backend("injected failure".to_string()));
		}
		self.successes_allowed.store(remaining - 1, Ordering::SeqCst);
		self.inner.insert(record).await
	}

	async fn find_by_id(&self, id: AuditRecordId) -> Result<Option<AuditRecord>, StoreError> {
		self.inner.find_by_id(id).await
	}

	async fn query(&self, filter: &AuditQuery) -> Result<Vec<AuditRecord>, StoreError> {
		self.inner.query(filter).await
	}

	async fn count(&self, filter: &AuditQuery) -> Result<u64, StoreError> {
		self.inner.count(filter).await
	}

	async fn delete(&self, filter: &AuditQuery) -> Result<u64, StoreError> {
		self.inner.delete(filter).await
	}
}
