// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory pool helpers for tests.

use sqlx::sqlite::SqlitePool;

use crate::schema::{create_audit_records_table, create_magic_links_table};

pub async fn create_test_pool() -> SqlitePool {
	SqlitePool::connect(":memory:").await.unwrap()
}

pub async fn create_magic_link_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_magic_links_table(&pool).await.unwrap();
	pool
}

pub async fn create_audit_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_audit_records_table(&pool).await.unwrap();
	pool
}

pub async fn create_full_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	crate::schema::run_migrations(&pool).await.unwrap();
	pool
}
