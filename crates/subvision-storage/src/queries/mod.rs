// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the queue tables and the description store.

pub mod descriptions;
pub mod queue;
