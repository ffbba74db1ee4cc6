// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for SubVision.
//!
//! Mock adapters for fast, deterministic tests without SQLite or HTTP:
//!
//! - [`MockQueue`] - in-memory queue recording sends and deletes
//! - [`MockDescriptionStore`] - in-memory description store
//! - [`MockImageGenerator`], [`MockValidator`], [`MockNotifier`] - scripted collaborators

pub mod mock_collaborators;
pub mod mock_queue;

pub use mock_collaborators::{
    MockDescriptionStore, MockImageGenerator, MockNotifier, MockValidator,
};
pub use mock_queue::MockQueue;
