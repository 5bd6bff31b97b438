// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token and PIN generation, and PIN hashing.
//!
//! Tokens are bearer credentials: 128 bits from the OS RNG, hex encoded,
//! never derived from the recipient or the clock. PINs are a second factor
//! for shared inboxes, stored only as argon2 hashes.

use argon2::password_hash::rand_core::OsRng as SaltRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use crate::error::{MagicLinkError, Result};

/// Token entropy in bytes. 16 bytes hex-encodes to 32 characters.
const TOKEN_BYTES: usize = 16;

/// Generate a new opaque access token: 32 lowercase hex characters.
pub fn generate_token() -> String {
	let mut bytes = [0u8; TOKEN_BYTES];
	OsRng.fill_bytes(&mut bytes);
	hex::encode(bytes)
}

/// Generate a 4-digit numeric PIN, zero padded.
pub fn generate_pin() -> String {
	format!("{:04}", OsRng.gen_range(0..10_000))
}

/// Hash a PIN for storage.
pub fn hash_pin(pin: &str) -> Result<String> {
	let salt = SaltString::generate(&mut SaltRng);
	let hash = Argon2::default()
		.hash_password(pin.as_bytes(), &salt)
		.map_err(|e| MagicLinkError::PinHash(e.to_string()))?;
	Ok(hash.to_string())
}

/// Verify a presented PIN against a stored hash. Constant time via argon2;
/// an unparseable hash verifies as false rather than erroring, since the
/// caller is on the opaque-failure path either way.
pub fn verify_pin(pin: &str, pin_hash: &str) -> bool {
	match PasswordHash::new(pin_hash) {
		Ok(parsed) => Argon2::default()
			.verify_password(pin.as_bytes(), &parsed)
			.is_ok(),
		Err(_) => false,
	}
}
