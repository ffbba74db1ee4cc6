// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live registry of connected clients.
//!
//! Each client owns a bounded outbound buffer drained by its socket writer.
//! The registry holds only the sending half plus a cancellation token that
//! closes the transport when the client is evicted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

struct ClientConnection {
    sender: mpsc::Sender<String>,
    closed: CancellationToken,
    connected_at: DateTime<Utc>,
    last_heartbeat: Instant,
}

/// Handles returned to the connection task on registration.
pub struct Registration {
    pub id: Uuid,
    /// Frames to write to the transport.
    pub outbound: mpsc::Receiver<String>,
    /// Cancelled when the registry evicts this client.
    pub closed: CancellationToken,
}

/// Result of one fan-out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub evicted: Vec<Uuid>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    clients: DashMap<Uuid, ClientConnection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client with an outbound buffer of `buffer` frames.
    pub fn register(&self, buffer: usize) -> Registration {
        let id = Uuid::new_v4();
        let (sender, outbound) = mpsc::channel(buffer.max(1));
        let closed = CancellationToken::new();
        self.clients.insert(
            id,
            ClientConnection {
                sender,
                closed: closed.clone(),
                connected_at: Utc::now(),
                last_heartbeat: Instant::now(),
            },
        );
        info!(client_id = %id, clients = self.clients.len(), "client registered");
        Registration {
            id,
            outbound,
            closed,
        }
    }

    /// Remove a client and close its transport. Returns whether it was present.
    pub fn remove(&self, id: &Uuid) -> bool {
        match self.clients.remove(id) {
            Some((_, client)) => {
                client.closed.cancel();
                let connected_secs = (Utc::now() - client.connected_at).num_seconds();
                info!(
                    client_id = %id,
                    connected_secs,
                    clients = self.clients.len(),
                    "client removed"
                );
                true
            }
            None => false,
        }
    }

    /// Refresh a client's heartbeat. Returns `false` for unknown clients.
    pub fn heartbeat(&self, id: &Uuid) -> bool {
        match self.clients.get_mut(id) {
            Some(mut client) => {
                client.last_heartbeat = Instant::now();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.clients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Queue a frame for one client. A full or closed buffer evicts it.
    pub fn send_to(&self, id: &Uuid, frame: String) -> bool {
        let result = match self.clients.get(id) {
            Some(client) => client.sender.try_send(frame),
            None => return false,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!(client_id = %id, reason = write_failure(&e), "client write failed");
                self.remove(id);
                false
            }
        }
    }

    /// Write `frame` to every client. Clients whose buffer is full or closed
    /// are evicted after the fan-out; the rest still receive the frame.
    pub fn broadcast(&self, frame: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for entry in self.clients.iter() {
            match entry.sender.try_send(frame.to_string()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    debug!(client_id = %entry.key(), reason = write_failure(&e), "client write failed");
                    report.evicted.push(*entry.key());
                }
            }
        }
        // Removal takes a shard write lock, so it must wait until iteration ends.
        for id in &report.evicted {
            self.remove(id);
        }
        report
    }

    /// Evict every client whose last heartbeat is older than `stale_after`.
    pub fn sweep_stale(&self, stale_after: Duration) -> Vec<Uuid> {
        let now = Instant::now();
        let stale: Vec<Uuid> = self
            .clients
            .iter()
            .filter(|entry| now.duration_since(entry.last_heartbeat) > stale_after)
            .map(|entry| *entry.key())
            .collect();
        for id in &stale {
            info!(client_id = %id, "evicting stale client");
            self.remove(id);
        }
        stale
    }
}

fn write_failure<T>(e: &TrySendError<T>) -> &'static str {
    match e {
        TrySendError::Full(_) => "buffer full",
        TrySendError::Closed(_) => "transport closed",
    }
}

/// Periodically evict stale clients until `cancel` fires.
pub async fn run_sweeper(
    registry: std::sync::Arc<ConnectionRegistry>,
    interval: Duration,
    stale_after: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = registry.sweep_stale(stale_after);
                if !evicted.is_empty() {
                    info!(evicted = evicted.len(), remaining = registry.len(), "stale sweep finished");
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
    debug!("stale sweeper stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_healthy_clients_and_evicts_broken_one() {
        let registry = ConnectionRegistry::new();
        let mut a = registry.register(4);
        let mut b = registry.register(4);
        let broken = registry.register(4);
        let broken_id = broken.id;
        drop(broken.outbound);

        let report = registry.broadcast("hello");
        assert_eq!(report.delivered, 2);
        assert_eq!(report.evicted, vec![broken_id]);
        assert!(broken.closed.is_cancelled());
        assert_eq!(registry.len(), 2);

        assert_eq!(a.outbound.recv().await.as_deref(), Some("hello"));
        assert_eq!(b.outbound.recv().await.as_deref(), Some("hello"));

        let report = registry.broadcast("again");
        assert_eq!(report.delivered, 2);
        assert!(report.evicted.is_empty());
    }

    #[tokio::test]
    async fn full_buffer_counts_as_write_failure() {
        let registry = ConnectionRegistry::new();
        let slow = registry.register(1);
        registry.broadcast("one");
        let report = registry.broadcast("two");
        assert_eq!(report.evicted, vec![slow.id]);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_evicts_only_silent_clients() {
        let registry = ConnectionRegistry::new();
        let silent = registry.register(4);
        let chatty = registry.register(4);

        tokio::time::advance(Duration::from_secs(90)).await;
        assert!(registry.heartbeat(&chatty.id));
        tokio::time::advance(Duration::from_secs(40)).await;

        let evicted = registry.sweep_stale(Duration::from_secs(120));
        assert_eq!(evicted, vec![silent.id]);
        assert!(silent.closed.is_cancelled());
        assert!(registry.contains(&chatty.id));
        assert!(!registry.heartbeat(&silent.id));
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_evicts_on_next_tick() {
        let registry = Arc::new(ConnectionRegistry::new());
        let client = registry.register(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_sweeper(
            registry.clone(),
            Duration::from_secs(60),
            Duration::from_secs(120),
            cancel.clone(),
        ));

        // Ticks at 60s and 120s see a client that is not yet past the threshold.
        tokio::time::sleep(Duration::from_secs(121)).await;
        assert!(registry.contains(&client.id));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!registry.contains(&client.id));
        assert!(registry.broadcast("after sweep").evicted.is_empty());
        assert_eq!(registry.broadcast("after sweep").delivered, 0);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn send_to_unknown_client_is_false() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send_to(&Uuid::new_v4(), "x".into()));
        assert!(!registry.remove(&Uuid::new_v4()));
    }
}
