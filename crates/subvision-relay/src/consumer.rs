// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ready-queue consumer with acknowledgment-gated deletion.
//!
//! One message is received per iteration, so at most one ready event is ever
//! awaiting acknowledgment. A message is deleted only when a client pulse
//! reaches the [`AckGate`] within the ack timeout; otherwise it stays on the
//! queue and is redelivered after its visibility timeout.

use std::sync::Arc;
use std::time::Duration;

use subvision_config::model::{QueuesConfig, RelayConfig};
use subvision_core::{QueueAdapter, QueueMessage, ReadyEvent, ReceiveOptions};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ack::AckGate;
use crate::broadcast::BroadcastHandle;
use crate::events::ClientEvent;

/// Phases of one relay iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Idle,
    AwaitingMessage,
    Broadcasting,
    AwaitingAck,
    Resolved(Resolution),
}

/// How an in-flight ready message was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Acknowledged in time and deleted.
    Acknowledged,
    /// No acknowledgment before the timeout; left for redelivery.
    TimedOut,
    /// The broadcaster could not take the event; left for redelivery.
    Abandoned,
}

/// Result of a single [`RelayConsumer::poll_once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Empty,
    ReceiveFailed,
    Resolved(Resolution),
    Cancelled,
}

pub struct RelayConsumer {
    queue: Arc<dyn QueueAdapter + Send + Sync>,
    ready_queue: String,
    broadcasts: BroadcastHandle,
    gate: Arc<AckGate>,
    options: ReceiveOptions,
    ack_timeout: Duration,
    error_backoff: Duration,
    idle_delay: Duration,
    image_path_prefix: String,
}

impl RelayConsumer {
    pub fn new(
        queue: Arc<dyn QueueAdapter + Send + Sync>,
        broadcasts: BroadcastHandle,
        gate: Arc<AckGate>,
        queues: &QueuesConfig,
        relay: &RelayConfig,
    ) -> Self {
        Self {
            queue,
            ready_queue: queues.ready.clone(),
            broadcasts,
            gate,
            options: ReceiveOptions {
                max_messages: 1,
                wait: relay.wait(),
                visibility_timeout: relay.visibility_timeout(),
            },
            ack_timeout: relay.ack_timeout(),
            error_backoff: relay.error_backoff(),
            idle_delay: relay.idle_delay(),
            image_path_prefix: relay.image_path_prefix.clone(),
        }
    }

    /// Run iterations until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(queue = self.ready_queue.as_str(), "relay consumer started");

        while !cancel.is_cancelled() {
            let pause = match self.poll_once(&cancel).await {
                PollOutcome::Cancelled => break,
                PollOutcome::ReceiveFailed => self.error_backoff,
                PollOutcome::Empty => self.idle_delay,
                PollOutcome::Resolved(_) => Duration::ZERO,
            };
            if !pause.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = cancel.cancelled() => break,
                }
            }
        }

        info!(queue = self.ready_queue.as_str(), "relay consumer stopped");
    }

    /// One receive -> broadcast -> await-ack -> settle cycle.
    pub async fn poll_once(&self, cancel: &CancellationToken) -> PollOutcome {
        self.enter(RelayPhase::AwaitingMessage);
        let received = tokio::select! {
            result = self.queue.receive(&self.ready_queue, &self.options) => result,
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
        };

        let message = match received {
            Ok(mut batch) if !batch.is_empty() => batch.swap_remove(0),
            Ok(_) => {
                self.enter(RelayPhase::Idle);
                return PollOutcome::Empty;
            }
            Err(e) => {
                warn!(
                    queue = self.ready_queue.as_str(),
                    error = %e,
                    backoff_secs = self.error_backoff.as_secs(),
                    "ready receive failed, backing off"
                );
                self.enter(RelayPhase::Idle);
                return PollOutcome::ReceiveFailed;
            }
        };

        self.enter(RelayPhase::Broadcasting);
        let event = self.client_event(&message);

        // Open before dispatch so an immediate client ack is not dropped.
        self.gate.begin().await;
        if let Err(e) = self.broadcasts.try_dispatch(event) {
            warn!(
                message_id = message.message_id.as_str(),
                error = %e,
                "broadcast unavailable, leaving message for redelivery"
            );
            return self.settle(Resolution::Abandoned).await;
        }

        self.enter(RelayPhase::AwaitingAck);
        let acknowledged = tokio::select! {
            acked = self.gate.wait(self.ack_timeout) => acked,
            _ = cancel.cancelled() => {
                self.gate.finish().await;
                return PollOutcome::Cancelled;
            }
        };

        if !acknowledged {
            info!(
                message_id = message.message_id.as_str(),
                timeout_secs = self.ack_timeout.as_secs(),
                "no acknowledgment, message will be redelivered"
            );
            return self.settle(Resolution::TimedOut).await;
        }

        match self.queue.delete(&self.ready_queue, &message.receipt).await {
            Ok(true) => info!(message_id = message.message_id.as_str(), "ready message acknowledged and deleted"),
            Ok(false) => warn!(
                message_id = message.message_id.as_str(),
                "receipt expired before delete; message will be redelivered"
            ),
            Err(e) => error!(
                message_id = message.message_id.as_str(),
                error = %e,
                "failed to delete acknowledged message"
            ),
        }
        self.settle(Resolution::Acknowledged).await
    }

    fn client_event(&self, message: &QueueMessage) -> ClientEvent {
        match serde_json::from_str::<ReadyEvent>(&message.body) {
            Ok(ready) => ClientEvent::image_ready(&ready, &self.image_path_prefix, message),
            Err(e) => {
                warn!(
                    message_id = message.message_id.as_str(),
                    error = %e,
                    "ready body did not parse, relaying raw message"
                );
                ClientEvent::sqs_message(message)
            }
        }
    }

    async fn settle(&self, resolution: Resolution) -> PollOutcome {
        self.gate.finish().await;
        self.enter(RelayPhase::Resolved(resolution));
        self.enter(RelayPhase::Idle);
        PollOutcome::Resolved(resolution)
    }

    fn enter(&self, phase: RelayPhase) {
        debug!(queue = self.ready_queue.as_str(), ?phase, "relay phase");
    }
}
