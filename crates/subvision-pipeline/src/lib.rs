// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stage 1 of the SubVision pipeline.
//!
//! [`JobQueueConsumer`] long-polls the jobs queue and hands each message to
//! [`JobProcessor`], which either publishes a ready event through
//! [`ReadyEventPublisher`] or routes the message to the dead-letter queue
//! through [`FailureRouter`].

pub mod consumer;
pub mod failure;
pub mod processor;
pub mod prompt;
pub mod ready;

pub use consumer::JobQueueConsumer;
pub use failure::{FailureRouter, RoutingOutcome};
pub use processor::{JobOutcome, JobProcessor};
pub use prompt::{PromptBuilder, PromptData};
pub use ready::ReadyEventPublisher;
