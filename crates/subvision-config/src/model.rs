// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the SubVision pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level SubVision configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubvisionConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// SQLite database backing the queues and the description store.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Queue names shared by both stages.
    #[serde(default)]
    pub queues: QueuesConfig,

    /// Stage 1 job consumer settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Stage 2 relay settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Gemini image generation and content validation.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Discord notification settings.
    #[serde(default)]
    pub discord: DiscordConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "subvision".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("subvision").join("subvision.db"))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "subvision.db".to_string())
}

/// Queue names.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueuesConfig {
    /// Source queue consumed by the worker.
    #[serde(default = "default_jobs_queue")]
    pub jobs: String,

    /// Side queue receiving failed job messages.
    #[serde(default = "default_dead_letter_queue")]
    pub dead_letter: String,

    /// FIFO queue of ready events drained by the relay.
    #[serde(default = "default_ready_queue")]
    pub ready: String,

    /// Message group used for every FIFO publish.
    #[serde(default = "default_message_group_id")]
    pub message_group_id: String,
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs_queue(),
            dead_letter: default_dead_letter_queue(),
            ready: default_ready_queue(),
            message_group_id: default_message_group_id(),
        }
    }
}

fn default_jobs_queue() -> String {
    "subvision-jobs.fifo".to_string()
}

fn default_dead_letter_queue() -> String {
    "subvision-jobs-dlq.fifo".to_string()
}

fn default_ready_queue() -> String {
    "subvision-ready.fifo".to_string()
}

fn default_message_group_id() -> String {
    "0".to_string()
}

/// Job consumer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Maximum messages requested per receive (1..=10).
    #[serde(default = "default_worker_max_messages")]
    pub max_messages: u32,

    /// Long-poll wait per receive.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,

    /// Visibility timeout; must cover generation latency.
    #[serde(default = "default_worker_visibility_secs")]
    pub visibility_timeout_secs: u64,

    /// Sleep after a failed receive.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Delay between poll iterations.
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,

    /// JSON file holding the prompt template and attribute pools.
    #[serde(default = "default_prompt_data_path")]
    pub prompt_data_path: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_messages: default_worker_max_messages(),
            wait_secs: default_wait_secs(),
            visibility_timeout_secs: default_worker_visibility_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            poll_delay_ms: default_poll_delay_ms(),
            prompt_data_path: default_prompt_data_path(),
        }
    }
}

impl WorkerConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }
}

fn default_worker_max_messages() -> u32 {
    10
}

fn default_wait_secs() -> u64 {
    20
}

fn default_worker_visibility_secs() -> u64 {
    60
}

fn default_error_backoff_secs() -> u64 {
    5
}

fn default_poll_delay_ms() -> u64 {
    500
}

fn default_prompt_data_path() -> String {
    "assets/prompt_data.json".to_string()
}

/// Relay service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Bind address for the HTTP/WebSocket server.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Long-poll wait per ready-queue receive.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,

    #[serde(default = "default_relay_visibility_secs")]
    pub visibility_timeout_secs: u64,

    /// How long a broadcast event waits for a client acknowledgment.
    #[serde(default = "default_ack_timeout_secs")]
    pub ack_timeout_secs: u64,

    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Sleep after an empty receive.
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,

    /// Interval between stale-connection sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Connections silent for longer than this are evicted.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Capacity of the consumer-to-broadcaster channel.
    #[serde(default = "default_broadcast_buffer")]
    pub broadcast_buffer: usize,

    /// Per-client outbound buffer.
    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,

    /// Path prefix prepended to image filenames in `image_ready` events.
    #[serde(default = "default_image_path_prefix")]
    pub image_path_prefix: String,

    /// Directory served under `/static/`.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Directory served under the image path prefix.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Minimum interval between description updates for one user.
    #[serde(default = "default_submission_cooldown_secs")]
    pub submission_cooldown_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            wait_secs: default_wait_secs(),
            visibility_timeout_secs: default_relay_visibility_secs(),
            ack_timeout_secs: default_ack_timeout_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            idle_delay_ms: default_idle_delay_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
            broadcast_buffer: default_broadcast_buffer(),
            client_buffer: default_client_buffer(),
            image_path_prefix: default_image_path_prefix(),
            static_dir: default_static_dir(),
            output_dir: default_output_dir(),
            submission_cooldown_secs: default_submission_cooldown_secs(),
        }
    }
}

impl RelayConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn submission_cooldown(&self) -> Duration {
        Duration::from_secs(self.submission_cooldown_secs)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_relay_visibility_secs() -> u64 {
    30
}

fn default_ack_timeout_secs() -> u64 {
    10
}

fn default_idle_delay_ms() -> u64 {
    1000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_stale_after_secs() -> u64 {
    120
}

fn default_broadcast_buffer() -> usize {
    1
}

fn default_client_buffer() -> usize {
    64
}

fn default_image_path_prefix() -> String {
    "/output_images/".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_output_dir() -> String {
    "output_images".to_string()
}

fn default_submission_cooldown_secs() -> u64 {
    10
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. `None` falls back to the `GEMINI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_validation_model")]
    pub validation_model: String,

    #[serde(default = "default_gemini_timeout_secs")]
    pub timeout_secs: u64,

    /// Directory generated images are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// JSON file with the content-safety prompt.
    #[serde(default = "default_safety_prompt_path")]
    pub safety_prompt_path: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            image_model: default_image_model(),
            validation_model: default_validation_model(),
            timeout_secs: default_gemini_timeout_secs(),
            output_dir: default_output_dir(),
            safety_prompt_path: default_safety_prompt_path(),
        }
    }
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image-preview".to_string()
}

fn default_validation_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_gemini_timeout_secs() -> u64 {
    50
}

fn default_safety_prompt_path() -> String {
    "assets/safety_prompt.json".to_string()
}

/// Discord notification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub bot_token: Option<String>,

    #[serde(default)]
    pub channel_id: Option<String>,

    #[serde(default = "default_discord_base_url")]
    pub base_url: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: None,
            channel_id: None,
            base_url: default_discord_base_url(),
        }
    }
}

fn default_discord_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}
