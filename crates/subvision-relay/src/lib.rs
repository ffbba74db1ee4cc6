// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stage 2 of the SubVision pipeline: the ready-event relay.
//!
//! [`RelayConsumer`] drains the ready queue one message at a time and hands
//! each event to the [`Broadcaster`], which writes it to every client in the
//! [`ConnectionRegistry`]. A client's `event_acknowledged` pulse reaches the
//! [`AckGate`]; only then is the message deleted.

pub mod ack;
pub mod broadcast;
pub mod consumer;
pub mod events;
pub mod handlers;
pub mod registry;
pub mod server;
pub mod ws;

pub use ack::{AckGate, SignalOutcome};
pub use broadcast::{BroadcastHandle, Broadcaster, DispatchError};
pub use consumer::{PollOutcome, RelayConsumer, RelayPhase, Resolution};
pub use events::{ClientCommand, ClientEvent};
pub use registry::{BroadcastReport, ConnectionRegistry, Registration, run_sweeper};
pub use server::{RelayState, router, serve, serve_on};
