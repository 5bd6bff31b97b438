// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scoped, expiring magic-link access for Cadence workspaces.
//!
//! An agency issues a [`MagicLink`] to an external recipient; the link's
//! token grants account-less access to one workspace under a set of
//! [`Scope`]s until it expires, is revoked, or is superseded by a reissue.
//! [`MagicLinkService`] owns the lifecycle and writes every issuance,
//! access, rejection, and revocation to the audit trail.

pub mod config;
pub mod error;
pub mod link;
pub mod service;
pub mod store;
pub mod testing;
pub mod token;

pub use config::{MagicLinkConfig, DEFAULT_LINK_TTL_DAYS};
pub use error::{MagicLinkError, Result, StoreError, ValidationFailure};
pub use link::{MagicLink, Scope};
pub use service::{IssueMagicLinkRequest, MagicLinkService};
pub use store::MagicLinkStore;
pub use token::{generate_pin, generate_token};
