// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Out-of-band notification trait.

use async_trait::async_trait;

use crate::error::SubvisionError;
use crate::traits::adapter::PluginAdapter;

/// Announces a finished image somewhere outside the pipeline.
///
/// Failures are reported to the caller but never affect message handling.
#[async_trait]
pub trait Notifier: PluginAdapter {
    async fn notify(&self, username: &str, image_path: &str) -> Result<(), SubvisionError>;
}
