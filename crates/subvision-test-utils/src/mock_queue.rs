// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory queue for deterministic pipeline tests.
//!
//! `MockQueue` implements `QueueAdapter` over per-queue in-memory state.
//! Received messages move to an in-flight set until deleted; visibility
//! expiry is simulated explicitly with [`MockQueue::expire_in_flight`].
//! Waits use tokio time, so paused-clock tests advance through them.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use subvision_core::{
    AdapterType, PluginAdapter, QueueAdapter, QueueMessage, ReceiveOptions, SendRequest,
    SubvisionError,
};

#[derive(Default)]
struct QueueState {
    available: VecDeque<QueueMessage>,
    in_flight: HashMap<String, QueueMessage>,
    sent: Vec<SendRequest>,
    deleted: Vec<String>,
    seen_dedup: HashMap<String, String>,
}

#[derive(Default)]
struct Inner {
    queues: HashMap<String, QueueState>,
    failing_sends: HashSet<String>,
    failing_receives: u32,
    receive_calls: u32,
}

/// A mock queue shared by clones.
#[derive(Clone, Default)]
pub struct MockQueue {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `body` available on `queue` as if a producer had sent it.
    /// Returns the message id.
    pub async fn push(&self, queue: &str, body: impl Into<String>) -> String {
        let message_id = uuid::Uuid::new_v4().to_string();
        let message = QueueMessage {
            message_id: message_id.clone(),
            receipt: String::new(),
            body: body.into(),
            attributes: HashMap::new(),
            receive_count: 0,
        };
        self.inner
            .lock()
            .await
            .queues
            .entry(queue.to_string())
            .or_default()
            .available
            .push_back(message);
        self.notify.notify_waiters();
        message_id
    }

    /// Every accepted (non-deduplicated) send to `queue`, in order.
    pub async fn sent(&self, queue: &str) -> Vec<SendRequest> {
        self.with_queue(queue, |q| q.sent.clone()).await
    }

    /// Receipts passed to a successful `delete` on `queue`, in order.
    pub async fn deleted(&self, queue: &str) -> Vec<String> {
        self.with_queue(queue, |q| q.deleted.clone()).await
    }

    /// Messages waiting to be received.
    pub async fn available(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.available.len()).await
    }

    /// Messages received but not deleted.
    pub async fn in_flight(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.in_flight.len()).await
    }

    /// Return every in-flight message on `queue` to the front of the queue,
    /// as a visibility timeout would.
    pub async fn expire_in_flight(&self, queue: &str) {
        let mut inner = self.inner.lock().await;
        let state = inner.queues.entry(queue.to_string()).or_default();
        let expired: Vec<_> = state.in_flight.drain().map(|(_, m)| m).collect();
        for message in expired {
            state.available.push_front(message);
        }
        drop(inner);
        self.notify.notify_waiters();
    }

    /// Make every subsequent send to `queue` fail.
    pub async fn fail_sends_to(&self, queue: &str) {
        self.inner.lock().await.failing_sends.insert(queue.to_string());
    }

    /// Make the next `count` receive calls fail.
    pub async fn fail_next_receives(&self, count: u32) {
        self.inner.lock().await.failing_receives = count;
    }

    /// Total receive calls made, including failed ones.
    pub async fn receive_calls(&self) -> u32 {
        self.inner.lock().await.receive_calls
    }

    async fn with_queue<T>(&self, queue: &str, f: impl FnOnce(&QueueState) -> T) -> T {
        let inner = self.inner.lock().await;
        match inner.queues.get(queue) {
            Some(state) => f(state),
            None => f(&QueueState::default()),
        }
    }
}

#[async_trait]
impl PluginAdapter for MockQueue {
    fn name(&self) -> &str {
        "mock-queue"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Queue
    }
}

#[async_trait]
impl QueueAdapter for MockQueue {
    async fn receive(
        &self,
        queue: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<QueueMessage>, SubvisionError> {
        let deadline = Instant::now() + options.wait;
        {
            let mut inner = self.inner.lock().await;
            inner.receive_calls += 1;
            if inner.failing_receives > 0 {
                inner.failing_receives -= 1;
                return Err(SubvisionError::queue("mock receive failure"));
            }
        }

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock().await;
                let state = inner.queues.entry(queue.to_string()).or_default();
                let take = state.available.len().min(options.max_messages as usize);
                if take > 0 {
                    let mut batch = Vec::with_capacity(take);
                    for mut message in state.available.drain(..take) {
                        message.receipt = uuid::Uuid::new_v4().to_string();
                        message.receive_count += 1;
                        state
                            .in_flight
                            .insert(message.receipt.clone(), message.clone());
                        batch.push(message);
                    }
                    return Ok(batch);
                }
            }

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }
    }

    async fn send(&self, queue: &str, request: SendRequest) -> Result<String, SubvisionError> {
        let mut inner = self.inner.lock().await;
        if inner.failing_sends.contains(queue) {
            return Err(SubvisionError::queue(format!("mock send failure on {queue}")));
        }
        let state = inner.queues.entry(queue.to_string()).or_default();

        if let Some(existing) = request
            .dedup_id
            .as_ref()
            .and_then(|d| state.seen_dedup.get(d))
        {
            return Ok(existing.clone());
        }

        let message_id = uuid::Uuid::new_v4().to_string();
        if let Some(dedup) = &request.dedup_id {
            state.seen_dedup.insert(dedup.clone(), message_id.clone());
        }
        state.available.push_back(QueueMessage {
            message_id: message_id.clone(),
            receipt: String::new(),
            body: request.body.clone(),
            attributes: request.attributes.clone(),
            receive_count: 0,
        });
        state.sent.push(request);
        drop(inner);
        self.notify.notify_waiters();
        Ok(message_id)
    }

    async fn delete(&self, queue: &str, receipt: &str) -> Result<bool, SubvisionError> {
        let mut inner = self.inner.lock().await;
        let state = inner.queues.entry(queue.to_string()).or_default();
        if state.in_flight.remove(receipt).is_some() {
            state.deleted.push(receipt.to_string());
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
