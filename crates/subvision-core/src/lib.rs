// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the SubVision image pipeline.
//!
//! This crate provides the shared message schemas, the error type, and the
//! adapter traits that decouple the two pipeline stages from their external
//! collaborators (queue backend, description store, image API, validator,
//! notifier).

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SubvisionError;
pub use types::{
    AdapterType, FailureReason, FailureRecord, HealthStatus, JobEvent, JobPayload,
    QueueMessage, ReadyEvent, ReceiveOptions, SendRequest, UserDescription,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    ContentValidator, DescriptionStore, ImageGenerator, Notifier, PluginAdapter, QueueAdapter,
};
