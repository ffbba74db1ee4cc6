// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Posts generated images to a Discord channel through the bot REST API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde_json::json;
use subvision_config::model::DiscordConfig;
use subvision_core::{AdapterType, Notifier, PluginAdapter, SubvisionError};
use tracing::{debug, info};

pub struct DiscordNotifier {
    client: reqwest::Client,
    messages_url: String,
    output_dir: PathBuf,
}

impl DiscordNotifier {
    pub fn new(
        bot_token: &str,
        channel_id: &str,
        base_url: &str,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, SubvisionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bot {bot_token}"))
                .map_err(|e| SubvisionError::Config(format!("invalid Discord bot token: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SubvisionError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            messages_url: format!(
                "{}/channels/{channel_id}/messages",
                base_url.trim_end_matches('/')
            ),
            output_dir: output_dir.into(),
        })
    }

    /// Builds a notifier from `[discord]`. Returns `Ok(None)` when disabled.
    pub fn from_config(
        config: &DiscordConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Option<Self>, SubvisionError> {
        if !config.enabled {
            return Ok(None);
        }
        let (Some(token), Some(channel)) = (config.bot_token.as_deref(), config.channel_id.as_deref())
        else {
            return Err(SubvisionError::Config(
                "discord.bot_token and discord.channel_id are required when discord is enabled".into(),
            ));
        };
        Self::new(token, channel, &config.base_url, output_dir).map(Some)
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

#[async_trait]
impl PluginAdapter for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, username: &str, image_path: &str) -> Result<(), SubvisionError> {
        let path = self.output_dir.join(image_path);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| SubvisionError::Storage { source: Box::new(e) })?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(image_path)
            .to_string();

        let payload = json!({
            "content": format!("Image generated for {username}"),
            "attachments": [{
                "id": 0,
                "description": "Generated image",
                "filename": filename,
            }],
        });
        let file = Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str(mime_for(&path))
            .map_err(|e| SubvisionError::Provider {
                message: format!("invalid attachment type: {e}"),
                source: Some(Box::new(e)),
            })?;
        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", file);

        let response = self
            .client
            .post(&self.messages_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SubvisionError::Provider {
                message: format!("Discord request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubvisionError::provider(format!(
                "Discord returned {status}: {body}"
            )));
        }
        debug!(status = %status, "Discord accepted message");
        info!(username, filename = filename.as_str(), "image posted to Discord");
        Ok(())
    }
}
