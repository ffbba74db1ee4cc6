// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini collaborators for SubVision.
//!
//! [`GeminiImageGenerator`] turns a prompt into an image file on disk and
//! [`GeminiValidator`] asks a text model whether a user description is safe
//! to store. Both share one [`GeminiClient`].

pub mod client;
pub mod image;
pub mod types;
pub mod validator;

pub use client::GeminiClient;
pub use image::{GeminiImageGenerator, image_filename};
pub use validator::{GeminiValidator, SafetyPrompt};
