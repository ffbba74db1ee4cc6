// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content validation trait for user-submitted descriptions.

use async_trait::async_trait;

use crate::error::SubvisionError;
use crate::traits::adapter::PluginAdapter;

#[async_trait]
pub trait ContentValidator: PluginAdapter {
    /// Returns `true` when `description` is acceptable to store.
    async fn validate(&self, description: &str) -> Result<bool, SubvisionError>;
}
