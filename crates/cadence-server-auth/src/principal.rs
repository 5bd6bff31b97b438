// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Principal resolution: the single attribution unit for audit records and
//! scope checks.
//!
//! A request enters the system either with an authenticated session, with a
//! magic-link token, or with nothing. Whatever the entry path, the access
//! layer resolves exactly one [`Principal`] and every downstream component
//! keys off it; there is no secondary notion of "current user".

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{MagicLinkId, Role, UserId, UserType, WorkspaceId};

/// How the actor behind a request was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
	/// An authenticated account holder.
	User,
	/// An external client acting through a magic link.
	MagicLink,
	/// No resolvable actor.
	Anonymous,
}

impl fmt::Display for PrincipalKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PrincipalKind::User => write!(f, "user"),
			PrincipalKind::MagicLink => write!(f, "magic_link"),
			PrincipalKind::Anonymous => write!(f, "anonymous"),
		}
	}
}

/// The resolved actor attributed to an action.
///
/// Derived per request, never persisted. Audit records store the projection
/// of a principal ([`Principal::user_type`] plus [`Principal::actor_id`]),
/// not the principal itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
	pub kind: PrincipalKind,
	/// Stringified id of the user or magic link, if any.
	pub id: Option<String>,
	/// Internal role; only meaningful for [`PrincipalKind::User`].
	pub role: Option<Role>,
}

impl Principal {
	/// An authenticated user with the given role.
	pub fn user(id: UserId, role: Role) -> Self {
		Self {
			kind: PrincipalKind::User,
			id: Some(id.to_string()),
			role: Some(role),
		}
	}

	/// A magic-link bearer.
	pub fn magic_link(id: MagicLinkId) -> Self {
		Self {
			kind: PrincipalKind::MagicLink,
			id: Some(id.to_string()),
			role: None,
		}
	}

	/// The anonymous principal.
	pub fn anonymous() -> Self {
		Self {
			kind: PrincipalKind::Anonymous,
			id: None,
			role: None,
		}
	}

	/// The attribution classification for audit records.
	///
	/// Users without a role record are attributed as clients, the weakest
	/// authenticated classification.
	pub fn user_type(&self) -> UserType {
		match self.kind {
			PrincipalKind::User => self.role.map_or(UserType::Client, UserType::from),
			PrincipalKind::MagicLink => UserType::MagicLink,
			PrincipalKind::Anonymous => UserType::Anonymous,
		}
	}

	/// Stringified actor id, if any.
	pub fn actor_id(&self) -> Option<&str> {
		self.id.as_deref()
	}

	pub fn is_anonymous(&self) -> bool {
		self.kind == PrincipalKind::Anonymous
	}
}

/// Contract consumed (not implemented) by this crate's dependents: role and
/// workspace-membership checks backed by whatever persistence the host
/// application uses.
pub trait RoleLookup: Send + Sync {
	fn is_admin(&self, principal: &Principal) -> bool;
	fn is_agency(&self, principal: &Principal) -> bool;
	fn is_client(&self, principal: &Principal) -> bool;
	fn can_access_workspace(&self, principal: &Principal, workspace_id: WorkspaceId) -> bool;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_principal_maps_role_to_user_type() {
		let p = Principal::user(UserId::generate(), Role::Agency);
		assert_eq!(p.kind, PrincipalKind::User);
		assert_eq!(p.user_type(), UserType::Agency);
		assert!(p.actor_id().is_some());
		assert!(!p.is_anonymous());
	}

	#[test]
	fn user_principal_without_role_is_client() {
		let mut p = Principal::user(UserId::generate(), Role::Admin);
		p.role = None;
		assert_eq!(p.user_type(), UserType::Client);
	}

	#[test]
	fn magic_link_principal_carries_link_id() {
		let id = MagicLinkId::generate();
		let p = Principal::magic_link(id);
		assert_eq!(p.user_type(), UserType::MagicLink);
		assert_eq!(p.actor_id(), Some(id.to_string().as_str()));
		assert_eq!(p.role, None);
	}

	#[test]
	fn anonymous_principal_has_no_id() {
		let p = Principal::anonymous();
		assert!(p.is_anonymous());
		assert_eq!(p.user_type(), UserType::Anonymous);
		assert_eq!(p.actor_id(), None);
	}

	#[test]
	fn principal_serde_roundtrip() {
		let p = Principal::user(UserId::generate(), Role::Client);
		let json = serde_json::to_string(&p).unwrap();
		let restored: Principal = serde_json::from_str(&json).unwrap();
		assert_eq!(restored, p);
	}
}
