// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory store implementation for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

use cadence_server_auth::WorkspaceId;

use crate::error::StoreError;
use crate::link::MagicLink;
use crate::store::MagicLinkStore;

/// Vec-backed [`MagicLinkStore`] enforcing the same uniqueness rules as the
/// SQL repository.
#[derive(Debug, Default)]
pub struct MemoryMagicLinkStore {
	links: Mutex<Vec<MagicLink>>,
}

impl MemoryMagicLinkStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every stored link, insertion order.
	pub fn all(&self) -> Vec<MagicLink> {
		self.lock().clone()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MagicLink>> {
		self.links.lock().unwrap_or_else(|e| e.into_inner())
	}
}

#[async_trait]
impl MagicLinkStore for MemoryMagicLinkStore {
	async fn insert(&self, link: &MagicLink) -> Result<(), StoreError> {
		let mut links = self.lock();
		if links.iter().any(|l| l.token == link.token) {
			return Err(StoreError::Conflict(
				"magic link token already exists".to_string(),
			));
		}
		if links.iter().any(|l| l.id == link.id) {
			return Err(StoreError::Conflict(format!(
				"magic link {} already exists",
				link.id
			)));
		}
		links.push(link.clone());
		Ok(())
	}

	async fn find_by_token(&self, token: &str) -> Result<Option<MagicLink>, StoreError> {
		Ok(self.lock().iter().find(|l| l.token == token).cloned())
	}

	async fn find_active_for_recipient(
		&self,
		workspace_id: WorkspaceId,
		email: &str,
	) -> Result<Option<MagicLink>, StoreError> {
		Ok(self
			.lock()
			.iter()
			.find(|l| l.workspace_id == workspace_id && l.email == email && l.is_active)
			.cloned())
	}

	async fn list_for_workspace(
		&self,
		workspace_id: WorkspaceId,
	) -> Result<Vec<MagicLink>, StoreError> {
		let mut links: Vec<MagicLink> = self
			.lock()
			.iter()
			.filter(|l| l.workspace_id == workspace_id)
			.cloned()
			.collect();
		links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(links)
	}

	async fn update(&self, link: &MagicLink) -> Result<(), StoreError> {
		let mut links = self.lock();
		match links.iter_mut().find(|l| l.id == link.id) {
			Some(existing) => {
				existing.is_active = link.is_active;
				existing.accessed_at = link.accessed_at;
				Ok(())
			}
			None => Err(StoreError::NotFound),
		}
	}

	async fn deactivate_for_recipient(
		&self,
		workspace_id: WorkspaceId,
		email: &str,
	) -> Result<u64, StoreError> {
		let mut count = 0;
		for link in self.lock().iter_mut() {
			if link.workspace_id == workspace_id && link.email == email && link.is_active {
				link.is_active = false;
				count += 1;
			}
		}
		Ok(count)
	}

	async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
		let mut count = 0;
		for link in self.lock().iter_mut() {
			if link.is_active && link.expires_at <= now {
				link.is_active = false;
				count += 1;
			}
		}
		Ok(count)
	}

	async fn delete_inactive_expired_before(
		&self,
		cutoff: DateTime<Utc>,
	) -> Result<u64, StoreError> {
		let mut links = self.lock();
		let before = links.len();
		links.retain(|l| l.is_active || l.expires_at >= cutoff);
		Ok((before - links.len()) as u64)
	}
}
