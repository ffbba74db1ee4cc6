// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image generation through a Gemini image model.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subvision_core::{AdapterType, ImageGenerator, PluginAdapter, SubvisionError};
use tracing::{debug, info};

use crate::client::GeminiClient;
use crate::types::InlineData;

/// Generates an image and writes it under `output_dir` as
/// `img_{username}_{yyyyMMdd_HHmmss}.{png|jpg}`.
pub struct GeminiImageGenerator {
    client: GeminiClient,
    model: String,
    output_dir: PathBuf,
}

impl GeminiImageGenerator {
    pub fn new(client: GeminiClient, model: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            model: model.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// Filename for an image generated for `username` at `at`.
pub fn image_filename(username: &str, at: chrono::DateTime<chrono::Utc>, mime_type: &str) -> String {
    let safe: String = username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("img_{safe}_{}.{}", at.format("%Y%m%d_%H%M%S"), extension(mime_type))
}

fn extension(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        _ => "png",
    }
}

#[async_trait]
impl PluginAdapter for GeminiImageGenerator {
    fn name(&self) -> &str {
        "gemini-image"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ImageGenerator
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    async fn generate(&self, prompt: &str, username: &str) -> Result<String, SubvisionError> {
        let response = self.client.generate_content(&self.model, prompt).await?;
        let parts = response
            .first_parts()
            .ok_or_else(|| SubvisionError::provider("no candidates returned from Gemini API"))?;

        let mut image: Option<&InlineData> = None;
        for part in parts {
            if let Some(text) = &part.text {
                debug!(text = text.as_str(), "Gemini text part");
            }
            if let Some(data) = &part.inline_data {
                image = Some(data);
                break;
            }
        }
        let image =
            image.ok_or_else(|| SubvisionError::provider("no image data found in Gemini response"))?;

        let bytes = STANDARD.decode(&image.data).map_err(|e| SubvisionError::Provider {
            message: format!("image data is not valid base64: {e}"),
            source: Some(Box::new(e)),
        })?;
        if bytes.is_empty() {
            return Err(SubvisionError::provider("Gemini returned an empty image"));
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| SubvisionError::Storage { source: Box::new(e) })?;
        let filename = image_filename(username, chrono::Utc::now(), &image.mime_type);
        tokio::fs::write(self.output_dir.join(&filename), &bytes)
            .await
            .map_err(|e| SubvisionError::Storage { source: Box::new(e) })?;

        info!(
            username,
            filename = filename.as_str(),
            bytes = bytes.len(),
            "image saved"
        );
        Ok(filename)
    }
}
