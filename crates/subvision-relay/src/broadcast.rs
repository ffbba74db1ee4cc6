// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out task between the relay consumer and the client registry.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::events::ClientEvent;
use crate::registry::ConnectionRegistry;

/// Why an event could not be handed to the broadcaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("broadcast channel is full")]
    Full,
    #[error("broadcaster has stopped")]
    Closed,
}

/// Producer side of the broadcast channel.
#[derive(Clone)]
pub struct BroadcastHandle {
    tx: mpsc::Sender<ClientEvent>,
}

impl BroadcastHandle {
    /// Hand `event` to the broadcaster without waiting.
    pub fn try_dispatch(&self, event: ClientEvent) -> Result<(), DispatchError> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::Full,
            TrySendError::Closed(_) => DispatchError::Closed,
        })
    }
}

/// Drains dispatched events and writes each to every registered client.
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    rx: mpsc::Receiver<ClientEvent>,
}

/// Create a broadcaster with a channel of `buffer` pending events.
pub fn channel(registry: Arc<ConnectionRegistry>, buffer: usize) -> (BroadcastHandle, Broadcaster) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (BroadcastHandle { tx }, Broadcaster { registry, rx })
}

impl Broadcaster {
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                event = self.rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = cancel.cancelled() => break,
            };

            let frame = match event.to_json() {
                Ok(frame) => frame,
                Err(e) => {
                    error!(error = %e, event_type = event.event_type.as_str(), "event serialization failed");
                    continue;
                }
            };

            let report = self.registry.broadcast(&frame);
            info!(
                event_type = event.event_type.as_str(),
                delivered = report.delivered,
                evicted = report.evicted.len(),
                "event broadcast"
            );
        }
        debug!("broadcaster stopped");
    }
}
