// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage abstraction for magic links.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cadence_server_auth::WorkspaceId;

use crate::error::StoreError;
use crate::link::MagicLink;

/// Persistence for magic links.
///
/// `update` is limited to the mutable lifecycle fields (`is_active`,
/// `accessed_at`); token, recipient, scopes, and expiry are immutable after
/// insert. Implementations enforce token uniqueness and surface violations
/// as [`StoreError::Conflict`], never a silent overwrite.
#[async_trait]
pub trait MagicLinkStore: Send + Sync {
	async fn insert(&self, link: &MagicLink) -> Result<(), StoreError>;

	async fn find_by_token(&self, token: &str) -> Result<Option<MagicLink>, StoreError>;

	/// The active link for a `(workspace, email)` pair, if one exists.
	async fn find_active_for_recipient(
		&self,
		workspace_id: WorkspaceId,
		email: &str,
	) -> Result<Option<MagicLink>, StoreError>;

	/// Every link ever issued for a workspace, newest first.
	async fn list_for_workspace(
		&self,
		workspace_id: WorkspaceId,
	) -> Result<Vec<MagicLink>, StoreError>;

	/// Persist lifecycle changes (`is_active`, `accessed_at`) for an
	/// existing link. [`StoreError::NotFound`] if the id is unknown.
	async fn update(&self, link: &MagicLink) -> Result<(), StoreError>;

	/// Deactivate every active link for the recipient pair. Returns the
	/// number of links deactivated. The first half of reissue supersession.
	async fn deactivate_for_recipient(
		&self,
		workspace_id: WorkspaceId,
		email: &str,
	) -> Result<u64, StoreError>;

	/// Deactivate every active link whose expiry is at or before `now`.
	async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

	/// Hard-delete inactive links that expired before `cutoff`. The only
	/// delete in the lifecycle; everything else is soft deactivation.
	async fn delete_inactive_expired_before(
		&self,
		cutoff: DateTime<Utc>,
	) -> Result<u64, StoreError>;
}
