// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the SubVision pipeline.

use thiserror::Error;

/// The primary error type used across all SubVision adapter traits and services.
#[derive(Debug, Error)]
pub enum SubvisionError {
    /// Configuration errors (invalid TOML, missing files, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Queue backend errors (receive, send, or delete failed).
    #[error("queue error: {message}")]
    Queue {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// External API errors (image generation, content validation, notification).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Wire-format errors when encoding or decoding a message body.
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Real-time client transport errors (write failed, channel closed).
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SubvisionError {
    /// Shorthand for a queue error without an underlying source.
    pub fn queue(message: impl Into<String>) -> Self {
        Self::Queue {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }
}
