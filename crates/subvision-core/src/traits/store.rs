// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Description store trait.

use async_trait::async_trait;

use crate::error::SubvisionError;
use crate::traits::adapter::PluginAdapter;
use crate::types::UserDescription;

/// Key-value store of user descriptions keyed by decimal user id.
#[async_trait]
pub trait DescriptionStore: PluginAdapter {
    /// Look up the description for `user_id`. `Ok(None)` when absent.
    async fn get(&self, user_id: &str) -> Result<Option<UserDescription>, SubvisionError>;

    /// Insert or replace the description for `user_id`, stamping the
    /// update time server-side.
    async fn put(&self, user_id: &str, description: &str) -> Result<(), SubvisionError>;
}
