// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for SubVision.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer model via `tokio-rusqlite`. On top of it sit a durable queue
//! with visibility timeouts, receipts, FIFO message groups and a dedup
//! window, and the user-description store.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::{SqliteDescriptionStore, SqliteQueue};
pub use database::Database;
pub use queries::queue::{DEDUP_WINDOW, QueueDepth};
