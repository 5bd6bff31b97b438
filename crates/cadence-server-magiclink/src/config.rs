// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Magic-link service configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::link::Scope;

/// Default link lifetime in days.
pub const DEFAULT_LINK_TTL_DAYS: i64 = 14;

/// Tunables for [`MagicLinkService`](crate::service::MagicLinkService).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLinkConfig {
	/// Base URL links are minted under, without a trailing slash.
	pub base_url: String,
	/// Lifetime applied when an issue request does not pin an expiry.
	pub link_ttl_days: i64,
	/// Scopes granted when an issue request leaves its scope set empty.
	///
	/// Ships as `{view, comment, approve}`: client review is the whole
	/// point of sending a link, so approval is on by default and deployments
	/// that want read-only links narrow this instead.
	pub default_scopes: BTreeSet<Scope>,
}

impl MagicLinkConfig {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			..Self::default()
		}
	}
}

impl Default for MagicLinkConfig {
	fn default() -> Self {
		Self {
			base_url: "http://localhost:3000".to_string(),
			link_ttl_days: DEFAULT_LINK_TTL_DAYS,
			default_scopes: BTreeSet::from([Scope::View, Scope::Comment, Scope::Approve]),
		}
	}
}
