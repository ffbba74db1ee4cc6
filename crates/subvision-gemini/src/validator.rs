// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Description safety check through a Gemini text model.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use subvision_core::{AdapterType, ContentValidator, PluginAdapter, SubvisionError};
use tracing::{info, warn};

use crate::client::GeminiClient;

/// Prompt file driving the safety check.
#[derive(Debug, Clone, Deserialize)]
pub struct SafetyPrompt {
    pub system_prompt: String,
    /// Contains `{description}`.
    pub user_prompt_template: String,
    pub expected_responses: Vec<String>,
}

impl SafetyPrompt {
    pub fn from_file(path: &Path) -> Result<Self, SubvisionError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SubvisionError::Config(format!("failed to read safety prompt {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            SubvisionError::Config(format!("failed to parse safety prompt {}: {e}", path.display()))
        })
    }

    pub fn render(&self, description: &str) -> String {
        let user = self.user_prompt_template.replace("{description}", description);
        format!("{}\n\n{user}", self.system_prompt)
    }

    /// A normalised answer is accepted only if it is one of the expected
    /// responses and that response is `yes`.
    pub fn accepts(&self, answer: &str) -> bool {
        let normalized = answer.trim().to_lowercase();
        match self
            .expected_responses
            .iter()
            .find(|expected| expected.trim().to_lowercase() == normalized)
        {
            Some(_) => normalized == "yes",
            None => {
                warn!(
                    answer = normalized.as_str(),
                    expected = ?self.expected_responses,
                    "unexpected validator response"
                );
                false
            }
        }
    }
}

pub struct GeminiValidator {
    client: GeminiClient,
    model: String,
    prompt: SafetyPrompt,
}

impl GeminiValidator {
    pub fn new(client: GeminiClient, model: impl Into<String>, prompt: SafetyPrompt) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
        }
    }
}

#[async_trait]
impl PluginAdapter for GeminiValidator {
    fn name(&self) -> &str {
        "gemini-validator"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ContentValidator
    }
}

#[async_trait]
impl ContentValidator for GeminiValidator {
    async fn validate(&self, description: &str) -> Result<bool, SubvisionError> {
        if description.trim().is_empty() {
            return Ok(false);
        }

        let response = self
            .client
            .generate_content(&self.model, &self.prompt.render(description))
            .await?;
        let parts = response
            .first_parts()
            .ok_or_else(|| SubvisionError::provider("no candidates returned from Gemini API"))?;
        let answer = parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .find(|t| !t.is_empty())
            .unwrap_or_default();

        let accepted = self.prompt.accepts(answer);
        info!(accepted, "description validated");
        Ok(accepted)
    }
}
