// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Magic-link issuance, validation, and lifecycle management.
//!
//! Validation is deliberately coupled to the audit trail: a successful
//! validation that cannot be recorded is treated as failed, because an
//! unauditable external access is worse than a retried one. Validation
//! *failures* are recorded best effort only.

use chrono::{Duration, Utc};
use serde_json::{json, Map};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use cadence_server_audit::{
	ActionKind, AuditRecordBuilder, AuditSeverity, AuditWriter, AuditableRef,
};
use cadence_server_auth::{MagicLinkId, RequestContext, UserType, WorkspaceId};

use crate::config::MagicLinkConfig;
use crate::error::{MagicLinkError, Result, StoreError, ValidationFailure};
use crate::link::{MagicLink, Scope};
use crate::store::MagicLinkStore;
use crate::token::{generate_token, hash_pin, verify_pin};

/// Entity type name stored on audit records about magic links.
const AUDITABLE_TYPE: &str = "magic_link";

/// Input to [`MagicLinkService::issue`].
#[derive(Debug, Clone)]
pub struct IssueMagicLinkRequest {
	pub workspace_id: WorkspaceId,
	pub email: String,
	pub display_name: String,
	/// Empty means "use the configured default set".
	pub scopes: BTreeSet<Scope>,
	/// Optional second factor. Hashed at issuance, never stored raw.
	pub pin: Option<String>,
	/// Overrides the configured link lifetime.
	pub expires_in_days: Option<i64>,
}

impl IssueMagicLinkRequest {
	pub fn new(
		workspace_id: WorkspaceId,
		email: impl Into<String>,
		display_name: impl Into<String>,
	) -> Self {
		Self {
			workspace_id,
			email: email.into(),
			display_name: display_name.into(),
			scopes: BTreeSet::new(),
			pin: None,
			expires_in_days: None,
		}
	}

	pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
		self.scopes = scopes.into_iter().collect();
		self
	}

	pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
		self.pin = Some(pin.into());
		self
	}

	pub fn with_expiry_days(mut self, days: i64) -> Self {
		self.expires_in_days = Some(days);
		self
	}
}

/// Issues, validates, and revokes magic links.
#[derive(Clone)]
pub struct MagicLinkService {
	store: Arc<dyn MagicLinkStore>,
	audit: AuditWriter,
	config: MagicLinkConfig,
}

impl MagicLinkService {
	pub fn new(
		store: Arc<dyn MagicLinkStore>,
		audit: AuditWriter,
		config: MagicLinkConfig,
	) -> Self {
		Self {
			store,
			audit,
			config,
		}
	}

	/// Issue a new link for a recipient, superseding any active link for
	/// the same `(workspace, email)` pair.
	///
	/// An empty scope set is replaced by the configured default. A token
	/// collision (astronomically rare, but the store surfaces it rather
	/// than overwriting) is retried once with a fresh token.
	#[instrument(skip_all, fields(workspace_id = %request.workspace_id))]
	pub async fn issue(
		&self,
		request: IssueMagicLinkRequest,
		ctx: &dyn RequestContext,
	) -> Result<MagicLink> {
		let scopes = if request.scopes.is_empty() {
			self.config.default_scopes.clone()
		} else {
			request.scopes
		};
		let pin_hash = match &request.pin {
			Some(pin) => Some(hash_pin(pin)?),
			None => None,
		};

		let superseded = self
			.store
			.deactivate_for_recipient(request.workspace_id, &request.email)
			.await?;
		if superseded > 0 {
			debug!(superseded, "prior active links deactivated for recipient");
		}

		let now = Utc::now();
		let ttl_days = request.expires_in_days.unwrap_or(self.config.link_ttl_days);
		let mut link = MagicLink {
			id: MagicLinkId::generate(),
			token: generate_token(),
			workspace_id: request.workspace_id,
			email: request.email,
			display_name: request.display_name,
			scopes,
			pin_hash,
			expires_at: now + Duration::days(ttl_days),
			is_active: true,
			created_at: now,
			accessed_at: None,
		};

		match self.store.insert(&link).await {
			Ok(()) => {}
			Err(StoreError::Conflict(_)) => {
				warn!("magic link token collision, retrying with a fresh token");
				link.token = generate_token();
				self.store.insert(&link).await?;
			}
			Err(err) => return Err(err.into()),
		}

		let mut details = Map::new();
		details.insert("email".to_string(), json!(link.email));
		details.insert(
			"scopes".to_string(),
			json!(link.scopes.iter().map(Scope::as_str).collect::<Vec<_>>()),
		);
		details.insert("expires_at".to_string(), json!(link.expires_at.to_rfc3339()));
		details.insert("superseded".to_string(), json!(superseded));
		details.insert("pin_protected".to_string(), json!(link.requires_pin()));
		self.audit
			.log(
				AuditRecordBuilder::new(ActionKind::MagicLinkIssued)
					.workspace(link.workspace_id)
					.auditable(AuditableRef::new(AUDITABLE_TYPE, link.id.to_string()))
					.new_values(details)
					.tag("security"),
				ctx,
			)
			.await?;

		debug!(link_id = %link.id, "magic link issued");
		Ok(link)
	}

	/// Validate a presented token (and PIN, when the link carries one).
	///
	/// On success the link's `accessed_at` moves to now and a
	/// `magic_link_accessed` record is written, attributed to the link
	/// itself. The audit write is mandatory; if it fails, validation fails.
	#[instrument(skip_all)]
	pub async fn validate(
		&self,
		token: &str,
		pin: Option<&str>,
		ctx: &dyn RequestContext,
	) -> Result<MagicLink> {
		let mut link = match self.store.find_by_token(token).await? {
			Some(link) => link,
			None => {
				return Err(self.reject(ValidationFailure::NotFound, None, ctx).await);
			}
		};

		if !link.is_active {
			return Err(self
				.reject(ValidationFailure::Inactive, Some(&link), ctx)
				.await);
		}
		let now = Utc::now();
		if link.expires_at <= now {
			return Err(self
				.reject(ValidationFailure::Expired, Some(&link), ctx)
				.await);
		}
		if let Some(pin_hash) = &link.pin_hash {
			let presented = pin.unwrap_or("");
			if !verify_pin(presented, pin_hash) {
				return Err(self
					.reject(ValidationFailure::PinMismatch, Some(&link), ctx)
					.await);
			}
		}

		link.accessed_at = Some(now);
		self.store.update(&link).await?;

		self.audit
			.log(
				AuditRecordBuilder::new(ActionKind::MagicLinkAccessed)
					.actor(link.id.to_string(), UserType::MagicLink)
					.workspace(link.workspace_id)
					.auditable(AuditableRef::new(AUDITABLE_TYPE, link.id.to_string()))
					.tag("security"),
				ctx,
			)
			.await?;

		debug!(link_id = %link.id, "magic link validated");
		Ok(link)
	}

	/// Record a rejected validation (best effort) and produce the opaque
	/// error. The audit record keeps the real reason; the caller's error
	/// does too, but its display never says more than "invalid or expired".
	async fn reject(
		&self,
		reason: ValidationFailure,
		link: Option<&MagicLink>,
		ctx: &dyn RequestContext,
	) -> MagicLinkError {
		let mut details = Map::new();
		details.insert("reason".to_string(), json!(reason.as_str()));

		let mut builder = AuditRecordBuilder::new(ActionKind::MagicLinkRejected)
			.severity(AuditSeverity::Warning)
			.new_values(details)
			.tag("security");
		if let Some(link) = link {
			builder = builder
				.workspace(link.workspace_id)
				.auditable(AuditableRef::new(AUDITABLE_TYPE, link.id.to_string()));
		}
		if let Err(err) = self.audit.log(builder, ctx).await {
			warn!(error = %err, "failed to record rejected magic-link validation");
		}

		warn!(reason = reason.as_str(), "magic link validation rejected");
		MagicLinkError::Invalid { reason }
	}

	/// Set-membership check against the link's granted scopes.
	pub fn has_scope(&self, link: &MagicLink, scope: Scope) -> bool {
		link.has_scope(scope)
	}

	/// Gate an operation on a scope.
	pub fn require_scope(&self, link: &MagicLink, scope: Scope) -> Result<()> {
		if link.has_scope(scope) {
			Ok(())
		} else {
			Err(MagicLinkError::MissingScope)
		}
	}

	/// Deactivate a link. Idempotent: revoking an already-inactive link is
	/// a no-op and writes no audit record.
	#[instrument(skip_all, fields(link_id = %link.id))]
	pub async fn revoke(&self, link: &MagicLink, ctx: &dyn RequestContext) -> Result<MagicLink> {
		if !link.is_active {
			debug!("revoke of inactive link is a no-op");
			return Ok(link.clone());
		}

		let mut revoked = link.clone();
		revoked.is_active = false;
		self.store.update(&revoked).await?;

		self.audit
			.log(
				AuditRecordBuilder::new(ActionKind::MagicLinkRevoked)
					.workspace(revoked.workspace_id)
					.auditable(AuditableRef::new(AUDITABLE_TYPE, revoked.id.to_string()))
					.tag("security"),
				ctx,
			)
			.await?;

		debug!("magic link revoked");
		Ok(revoked)
	}

	/// Soft-deactivate every expired-but-active link. Idempotent; a second
	/// run finds nothing to do and returns 0.
	#[instrument(skip(self))]
	pub async fn cleanup_expired(&self) -> Result<u64> {
		let deactivated = self.store.deactivate_expired(Utc::now()).await?;
		debug!(deactivated, "expired magic links deactivated");
		Ok(deactivated)
	}

	/// Hard-delete inactive links that expired more than `older_than_days`
	/// days ago.
	#[instrument(skip(self))]
	pub async fn purge_old(&self, older_than_days: i64) -> Result<u64> {
		let cutoff = Utc::now() - Duration::days(older_than_days);
		let deleted = self.store.delete_inactive_expired_before(cutoff).await?;
		debug!(deleted, "old inactive magic links purged");
		Ok(deleted)
	}

	/// The URL a recipient follows to use the link.
	pub fn access_url(&self, link: &MagicLink) -> String {
		format!(
			"{}/magic-link/{}",
			self.config.base_url.trim_end_matches('/'),
			link.token
		)
	}

	/// The active link for a recipient pair, if any.
	pub async fn active_link_for(
		&self,
		workspace_id: WorkspaceId,
		email: &str,
	) -> Result<Option<MagicLink>> {
		Ok(self
			.store
			.find_active_for_recipient(workspace_id, email)
			.await?)
	}

	/// Every link issued for a workspace, newest first.
	pub async fn links_for_workspace(&self, workspace_id: WorkspaceId) -> Result<Vec<MagicLink>> {
		Ok(self.store.list_for_workspace(workspace_id).await?)
	}
}
