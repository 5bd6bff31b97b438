// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for identity and attribution.
//!
//! This module defines the foundational types used throughout Cadence:
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs for different entity types
//!   ([`UserId`], [`WorkspaceId`], [`MagicLinkId`]) preventing accidental mixing
//! - **Role enum**: The three internal roles an authenticated user can hold
//!   ([`Role`])
//! - **User types**: The attribution classification every audit record carries
//!   ([`UserType`])
//!
//! All ID types implement transparent serde serialization (as UUID strings) and
//! provide conversion to/from [`uuid::Uuid`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(WorkspaceId, "Unique identifier for a client workspace.");
define_id_type!(MagicLinkId, "Unique identifier for a magic link.");

// =============================================================================
// Roles
// =============================================================================

/// Roles an authenticated (account-holding) user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Full system access, manages agency staff and workspaces.
	Admin,
	/// Agency staff: creates content, issues magic links, runs syncs.
	Agency,
	/// Client account holder: reviews and approves workspace content.
	Client,
}

impl Role {
	/// Returns all available roles.
	pub fn all() -> &'static [Role] {
		&[Role::Admin, Role::Agency, Role::Client]
	}

	/// Returns true if this role has at least the permissions of the given role.
	pub fn has_permission_of(&self, other: &Role) -> bool {
		matches!(
			(self, other),
			(Role::Admin, _)
				| (Role::Agency, Role::Agency | Role::Client)
				| (Role::Client, Role::Client)
		)
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::Admin => write!(f, "admin"),
			Role::Agency => write!(f, "agency"),
			Role::Client => write!(f, "client"),
		}
	}
}

// =============================================================================
// User types
// =============================================================================

/// Attribution classification carried by every audit record.
///
/// Unlike [`Role`], this also covers actors without an account: magic-link
/// bearers and fully anonymous requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
	/// System administrator.
	Admin,
	/// Agency staff member.
	Agency,
	/// Client account holder.
	Client,
	/// External client acting through a magic link.
	MagicLink,
	/// No resolvable actor.
	#[default]
	Anonymous,
}

impl UserType {
	/// Returns all user types.
	pub fn all() -> &'static [UserType] {
		&[
			UserType::Admin,
			UserType::Agency,
			UserType::Client,
			UserType::MagicLink,
			UserType::Anonymous,
		]
	}

	/// Stable string form, matching the serde representation.
	pub fn as_str(&self) -> &'static str {
		match self {
			UserType::Admin => "admin",
			UserType::Agency => "agency",
			UserType::Client => "client",
			UserType::MagicLink => "magic_link",
			UserType::Anonymous => "anonymous",
		}
	}

	/// Parse the stable string form.
	pub fn parse(s: &str) -> Option<UserType> {
		match s {
			"admin" => Some(UserType::Admin),
			"agency" => Some(UserType::Agency),
			"client" => Some(UserType::Client),
			"magic_link" => Some(UserType::MagicLink),
			"anonymous" => Some(UserType::Anonymous),
			_ => None,
		}
	}
}

impl fmt::Display for UserType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl From<Role> for UserType {
	fn from(role: Role) -> Self {
		match role {
			Role::Admin => UserType::Admin,
			Role::Agency => UserType::Agency,
			Role::Client => UserType::Client,
		}
	}
}
