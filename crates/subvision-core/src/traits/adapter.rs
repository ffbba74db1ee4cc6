// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all collaborator adapters implement.

use async_trait::async_trait;

use crate::error::SubvisionError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for all SubVision adapters.
///
/// Provides identity and a health check. Backends that hold no resources
/// can rely on the default health check.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns which collaborator this adapter implements.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, SubvisionError> {
        Ok(HealthStatus::Healthy)
    }
}
