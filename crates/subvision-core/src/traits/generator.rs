// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image generation trait.

use async_trait::async_trait;

use crate::error::SubvisionError;
use crate::traits::adapter::PluginAdapter;

/// Turns a prompt into an image file in the output directory.
#[async_trait]
pub trait ImageGenerator: PluginAdapter {
    /// Generate an image for `username` and return the filename it was
    /// written under, relative to the output directory.
    async fn generate(&self, prompt: &str, username: &str) -> Result<String, SubvisionError>;
}
