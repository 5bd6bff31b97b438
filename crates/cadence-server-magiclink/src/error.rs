// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for magic-link issuance and validation.

use thiserror::Error;

use cadence_server_audit::AuditError;

/// Why a validation failed, internally.
///
/// Never shown to the link holder. The public surface collapses every
/// failure into the one opaque message so the error cannot be used to probe
/// which tokens exist, which are revoked, and which merely need a PIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
	/// No link carries this token.
	NotFound,
	/// The link was revoked or superseded.
	Inactive,
	/// The link's expiry has passed.
	Expired,
	/// The link requires a PIN and the presented one did not match.
	PinMismatch,
}

impl ValidationFailure {
	/// Stable label for logs and security-event records.
	pub fn as_str(&self) -> &'static str {
		match self {
			ValidationFailure::NotFound => "not_found",
			ValidationFailure::Inactive => "inactive",
			ValidationFailure::Expired => "expired",
			ValidationFailure::PinMismatch => "pin_mismatch",
		}
	}
}

/// Errors surfaced by [`MagicLinkStore`](crate::store::MagicLinkStore)
/// implementations.
#[derive(Debug, Error)]
pub enum StoreError {
	/// A uniqueness constraint was violated (duplicate token).
	#[error("conflict: {0}")]
	Conflict(String),

	/// The requested link does not exist.
	#[error("magic link not found")]
	NotFound,

	/// The backing store failed.
	#[error("store backend error: {0}")]
	Backend(String),
}

/// Errors surfaced by the magic-link service.
#[derive(Debug, Error)]
pub enum MagicLinkError {
	/// Validation failed. One message for every cause.
	#[error("magic link is invalid or expired")]
	Invalid { reason: ValidationFailure },

	/// The link is valid but does not carry the required scope.
	#[error("insufficient permissions")]
	MissingScope,

	/// PIN hashing failed at issuance.
	#[error("pin hashing failed: {0}")]
	PinHash(String),

	#[error(transparent)]
	Store(#[from] StoreError),

	#[error(transparent)]
	Audit(#[from] AuditError),
}

impl MagicLinkError {
	/// The internal failure classification, when this is a validation error.
	pub fn reason(&self) -> Option<ValidationFailure> {
		match self {
			MagicLinkError::Invalid { reason } => Some(*reason),
			_ => None,
		}
	}
}

/// Convenience result type for magic-link operations.
pub type Result<T> = std::result::Result<T, MagicLinkError>;
