// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted stand-ins for the external collaborators.
//!
//! Each mock records its calls for assertions and can be switched into a
//! failing mode.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use subvision_core::{
    AdapterType, ContentValidator, DescriptionStore, ImageGenerator, Notifier, PluginAdapter,
    SubvisionError, UserDescription,
};

/// In-memory description store.
#[derive(Clone, Default)]
pub struct MockDescriptionStore {
    entries: Arc<Mutex<HashMap<String, UserDescription>>>,
    fail: Arc<AtomicBool>,
}

impl MockDescriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a description with a fixed timestamp.
    pub async fn insert(&self, user_id: &str, description: &str, last_updated: &str) {
        self.entries.lock().await.insert(
            user_id.to_string(),
            UserDescription {
                user_id: user_id.to_string(),
                description: description.to_string(),
                last_updated: last_updated.to_string(),
            },
        );
    }

    /// Make every get and put fail.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), SubvisionError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(SubvisionError::Storage {
                source: "mock store failure".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PluginAdapter for MockDescriptionStore {
    fn name(&self) -> &str {
        "mock-descriptions"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DescriptionStore
    }
}

#[async_trait]
impl DescriptionStore for MockDescriptionStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserDescription>, SubvisionError> {
        self.check()?;
        Ok(self.entries.lock().await.get(user_id).cloned())
    }

    async fn put(&self, user_id: &str, description: &str) -> Result<(), SubvisionError> {
        self.check()?;
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        self.insert(user_id, description, &now).await;
        Ok(())
    }
}

/// Image generator returning a fixed filename.
#[derive(Clone)]
pub struct MockImageGenerator {
    filename: Arc<Mutex<Option<String>>>,
    prompts: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockImageGenerator {
    /// Succeed with `filename` on every call.
    pub fn returning(filename: &str) -> Self {
        Self {
            filename: Arc::new(Mutex::new(Some(filename.to_string()))),
            prompts: Arc::default(),
        }
    }

    /// Fail every call.
    pub fn failing() -> Self {
        Self {
            filename: Arc::new(Mutex::new(None)),
            prompts: Arc::default(),
        }
    }

    /// `(prompt, username)` pairs seen so far.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockImageGenerator {
    fn name(&self) -> &str {
        "mock-image-generator"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ImageGenerator
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    async fn generate(&self, prompt: &str, username: &str) -> Result<String, SubvisionError> {
        self.prompts
            .lock()
            .await
            .push((prompt.to_string(), username.to_string()));
        self.filename
            .lock()
            .await
            .clone()
            .ok_or_else(|| SubvisionError::provider("mock generation failure"))
    }
}

/// Validator returning a fixed verdict.
#[derive(Clone)]
pub struct MockValidator {
    verdict: Option<bool>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl MockValidator {
    pub fn accepting() -> Self {
        Self {
            verdict: Some(true),
            seen: Arc::default(),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            verdict: Some(false),
            seen: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            verdict: None,
            seen: Arc::default(),
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockValidator {
    fn name(&self) -> &str {
        "mock-validator"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ContentValidator
    }
}

#[async_trait]
impl ContentValidator for MockValidator {
    async fn validate(&self, description: &str) -> Result<bool, SubvisionError> {
        self.seen.lock().await.push(description.to_string());
        self.verdict
            .ok_or_else(|| SubvisionError::provider("mock validation failure"))
    }
}

/// Notifier recording every notification.
#[derive(Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail: Arc<AtomicBool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// `(username, image_path)` pairs seen so far, including failed ones.
    pub async fn notifications(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockNotifier {
    fn name(&self) -> &str {
        "mock-notifier"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, username: &str, image_path: &str) -> Result<(), SubvisionError> {
        self.sent
            .lock()
            .await
            .push((username.to_string(), image_path.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(SubvisionError::provider("mock notify failure"));
        }
        Ok(())
    }
}
