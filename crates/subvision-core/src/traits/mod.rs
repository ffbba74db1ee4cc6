// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the SubVision pipeline collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod generator;
pub mod notifier;
pub mod queue;
pub mod store;
pub mod validator;

pub use adapter::PluginAdapter;
pub use generator::ImageGenerator;
pub use notifier::Notifier;
pub use queue::QueueAdapter;
pub use store::DescriptionStore;
pub use validator::ContentValidator;
