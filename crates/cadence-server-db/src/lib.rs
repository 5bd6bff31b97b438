// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for Cadence.
//!
//! Two repositories back the domain store traits:
//! [`SqliteMagicLinkRepository`] implements
//! [`MagicLinkStore`](cadence_server_magiclink::MagicLinkStore) and
//! [`SqliteAuditRepository`] implements
//! [`AuditRecordStore`](cadence_server_audit::AuditRecordStore).

pub mod audit;
pub mod error;
pub mod magic_link;
pub mod pool;
pub mod schema;
pub mod testing;

pub use audit::SqliteAuditRepository;
pub use error::{DbError, Result};
pub use magic_link::SqliteMagicLinkRepository;
pub use pool::create_pool;
pub use schema::run_migrations;
