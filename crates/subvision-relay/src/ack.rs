// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-slot acknowledgment mailbox.
//!
//! The relay consumer opens the gate before broadcasting an event and closes
//! it after the wait resolves. Clients signal into the slot from their
//! connection tasks. The slot holds at most one pulse: extra pulses while
//! one is pending are dropped, and pulses while the gate is closed are
//! ignored. The slot is drained on both open and close so a late pulse
//! never leaks into the next event's wait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::sync::mpsc::error::TrySendError;

/// Result of a client's acknowledgment pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The pulse filled the slot.
    Accepted,
    /// A pulse was already pending; this one was dropped.
    AlreadyPending,
    /// No event is awaiting acknowledgment.
    Idle,
}

pub struct AckGate {
    tx: mpsc::Sender<()>,
    rx: Mutex<mpsc::Receiver<()>>,
    awaiting: AtomicBool,
}

impl Default for AckGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AckGate {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Mutex::new(rx),
            awaiting: AtomicBool::new(false),
        }
    }

    /// Start awaiting an acknowledgment, discarding any stray pulse.
    pub async fn begin(&self) {
        let mut rx = self.rx.lock().await;
        while rx.try_recv().is_ok() {}
        self.awaiting.store(true, Ordering::SeqCst);
    }

    /// Non-blocking pulse from a client.
    pub fn try_signal(&self) -> SignalOutcome {
        if !self.awaiting.load(Ordering::SeqCst) {
            return SignalOutcome::Idle;
        }
        match self.tx.try_send(()) {
            Ok(()) => SignalOutcome::Accepted,
            Err(TrySendError::Full(())) => SignalOutcome::AlreadyPending,
            Err(TrySendError::Closed(())) => SignalOutcome::Idle,
        }
    }

    /// Wait up to `timeout` for a pulse. Returns whether one arrived.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.rx.lock().await;
        matches!(tokio::time::timeout(timeout, rx.recv()).await, Ok(Some(())))
    }

    /// Stop awaiting and drain the slot.
    pub async fn finish(&self) {
        self.awaiting.store(false, Ordering::SeqCst);
        let mut rx = self.rx.lock().await;
        while rx.try_recv().is_ok() {}
    }

    /// Whether an event is currently awaiting acknowledgment.
    pub fn is_awaiting(&self) -> bool {
        self.awaiting.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn pulses_are_ignored_while_idle() {
        let gate = AckGate::new();
        assert_eq!(gate.try_signal(), SignalOutcome::Idle);

        gate.begin().await;
        assert!(!gate.wait(Duration::ZERO).await);
    }

    #[tokio::test]
    async fn second_pulse_is_dropped() {
        let gate = AckGate::new();
        gate.begin().await;
        assert_eq!(gate.try_signal(), SignalOutcome::Accepted);
        assert_eq!(gate.try_signal(), SignalOutcome::AlreadyPending);

        assert!(gate.wait(Duration::from_millis(10)).await);
        assert!(!gate.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn pulse_within_timeout_is_observed() {
        let gate = Arc::new(AckGate::new());
        gate.begin().await;

        let signaller = gate.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(9)).await;
            signaller.try_signal()
        });

        assert!(gate.wait(Duration::from_secs(10)).await);
        gate.finish().await;
        assert!(!gate.is_awaiting());
    }

    #[tokio::test(start_paused = true)]
    async fn pulse_after_timeout_is_discarded_by_finish() {
        let gate = Arc::new(AckGate::new());
        gate.begin().await;

        let signaller = gate.clone();
        let late = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(11)).await;
            signaller.try_signal()
        });

        assert!(!gate.wait(Duration::from_secs(10)).await);
        // Still open: the late pulse lands in the slot until finish drains it.
        assert_eq!(late.await.unwrap(), SignalOutcome::Accepted);
        gate.finish().await;

        gate.begin().await;
        assert!(!gate.wait(Duration::from_secs(1)).await);
    }
}
