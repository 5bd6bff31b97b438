// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The magic-link model and its scope grammar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use cadence_server_auth::{MagicLinkId, WorkspaceId};

/// What a magic-link holder may do inside the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
	/// Read the content calendar and item detail.
	View,
	/// Leave comments on content items.
	Comment,
	/// Approve or reject content items.
	Approve,
	/// Download attached assets.
	Download,
}

impl Scope {
	pub fn as_str(&self) -> &'static str {
		match self {
			Scope::View => "view",
			Scope::Comment => "comment",
			Scope::Approve => "approve",
			Scope::Download => "download",
		}
	}

	pub fn parse(s: &str) -> Option<Scope> {
		match s {
			"view" => Some(Scope::View),
			"comment" => Some(Scope::Comment),
			"approve" => Some(Scope::Approve),
			"download" => Some(Scope::Download),
			_ => None,
		}
	}

	pub fn all() -> &'static [Scope] {
		&[Scope::View, Scope::Comment, Scope::Approve, Scope::Download]
	}
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// A scoped, expiring grant of workspace access for an external recipient.
///
/// Lifecycle: active, then expired (implicitly, by the clock) or inactive
/// (revoked, superseded by a reissue, or swept by cleanup). There is no path
/// back to active; a fresh link is issued instead. Rows are hard-deleted
/// only by retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagicLink {
	pub id: MagicLinkId,
	/// Opaque bearer token, unique across all links.
	pub token: String,
	pub workspace_id: WorkspaceId,
	/// Recipient address. One active link per `(workspace_id, email)`.
	pub email: String,
	/// Name shown on comments and approvals made through this link.
	pub display_name: String,
	/// Never empty; issuance substitutes the configured default set.
	pub scopes: BTreeSet<Scope>,
	/// Argon2 hash of the optional access PIN.
	pub pin_hash: Option<String>,
	pub expires_at: DateTime<Utc>,
	pub is_active: bool,
	pub created_at: DateTime<Utc>,
	/// Last successful validation, if any. Moves forward only.
	pub accessed_at: Option<DateTime<Utc>>,
}

impl MagicLink {
	/// True when the link is active and unexpired at `now`.
	pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
		self.is_active && self.expires_at > now
	}

	pub fn has_scope(&self, scope: Scope) -> bool {
		self.scopes.contains(&scope)
	}

	pub fn requires_pin(&self) -> bool {
		self.pin_hash.is_some()
	}
}
