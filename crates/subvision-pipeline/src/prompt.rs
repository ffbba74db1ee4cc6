// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly from a template and random attribute pools.
//!
//! [`PromptBuilder`] owns the loaded tables and its random source. Seed it
//! with [`PromptBuilder::with_seed`] for reproducible prompts.

use std::path::Path;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use subvision_core::SubvisionError;
use tracing::{debug, info};

/// Percent chance of a sign instead of an action.
const SIGN_PERCENT: u32 = 30;
/// Percent chance of the golden suffix.
const GOLDEN_PERCENT: u32 = 2;

const GOLDEN_SPECIAL: &str =
    "\n\nThis is a special generation, make it all golden like its something rare.";

const FALLBACK_BACKGROUND: &str = "neutral background";
const FALLBACK_EMOTION: &str = "neutral";
const FALLBACK_ACTION: &str = "standing normally";
const FALLBACK_SIGN: &str = "hello";

/// Prompt template and attribute pools, as stored on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptData {
    pub base_prompt: String,
    #[serde(default)]
    pub sign_texts: Vec<String>,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub backgrounds: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Which random attributes went into a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptChoices {
    pub background: String,
    pub emotion: String,
    pub action_or_sign: String,
    pub golden: bool,
}

pub struct PromptBuilder {
    data: PromptData,
    rng: Mutex<StdRng>,
}

impl PromptBuilder {
    /// Build with an entropy-seeded random source.
    pub fn new(data: PromptData) -> Self {
        Self {
            data,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(data: PromptData, seed: u64) -> Self {
        Self {
            data,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Load the tables from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, SubvisionError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SubvisionError::Config(format!("cannot read prompt data {}: {e}", path.display()))
        })?;
        let data: PromptData = serde_json::from_str(&raw)?;
        info!(
            backgrounds = data.backgrounds.len(),
            emotions = data.emotions.len(),
            actions = data.actions.len(),
            sign_texts = data.sign_texts.len(),
            "prompt data loaded"
        );
        Ok(Self::new(data))
    }

    /// Pick one value for every placeholder.
    pub fn choose(&self) -> PromptChoices {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let background = pick(&self.data.backgrounds, FALLBACK_BACKGROUND, &mut *rng);
        let emotion = pick(&self.data.emotions, FALLBACK_EMOTION, &mut *rng);
        let action_or_sign = if rng.gen_range(0..100) < SIGN_PERCENT {
            let text = pick(&self.data.sign_texts, FALLBACK_SIGN, &mut *rng);
            format!("holding a sign that says \"{text}\"")
        } else {
            pick(&self.data.actions, FALLBACK_ACTION, &mut *rng)
        };
        let golden = rng.gen_range(0..100) < GOLDEN_PERCENT;

        PromptChoices {
            background,
            emotion,
            action_or_sign,
            golden,
        }
    }

    /// Render the template for `description` with fresh random choices.
    pub fn build(&self, description: &str) -> String {
        let choices = self.choose();
        debug!(
            background = choices.background.as_str(),
            emotion = choices.emotion.as_str(),
            action_or_sign = choices.action_or_sign.as_str(),
            golden = choices.golden,
            "prompt attributes chosen"
        );
        self.render(description, &choices)
    }

    /// Render the template with explicit choices.
    pub fn render(&self, description: &str, choices: &PromptChoices) -> String {
        self.data
            .base_prompt
            .replace("{USER_DESCRIPTION}", description)
            .replace("{BACKGROUND}", &choices.background)
            .replace("{EMOTION}", &choices.emotion)
            .replace("{ACTION_OR_SIGN}", &choices.action_or_sign)
            .replace(
                "{GOLDEN_SPECIAL}",
                if choices.golden { GOLDEN_SPECIAL } else { "" },
            )
    }
}

fn pick(pool: &[String], fallback: &str, rng: &mut StdRng) -> String {
    pool.choose(rng)
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}
