// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity and attribution primitives for Cadence.
//!
//! This crate carries the types every other Cadence crate agrees on: ID
//! newtypes, the [`Principal`] attribution unit, the [`RoleLookup`] contract,
//! and the injectable [`RequestContext`] that replaces ambient
//! "current request" state.

pub mod context;
pub mod principal;
pub mod types;

pub use context::{RequestContext, StaticRequestContext};
pub use principal::{Principal, PrincipalKind, RoleLookup};
pub use types::{MagicLinkId, Role, UserId, UserType, WorkspaceId};
