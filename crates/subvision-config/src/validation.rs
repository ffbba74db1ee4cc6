// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks run after deserialization.
//!
//! All failures are collected; validation does not stop at the first error.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::SubvisionConfig;

/// Validate a deserialized configuration.
pub fn validate_config(config: &SubvisionConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let queues = [
        ("queues.jobs", &config.queues.jobs),
        ("queues.dead_letter", &config.queues.dead_letter),
        ("queues.ready", &config.queues.ready),
    ];
    let mut seen = HashSet::new();
    for (key, name) in queues {
        if name.trim().is_empty() {
            fail(format!("{key} must not be empty"));
        } else if !seen.insert(name.as_str()) {
            fail(format!("{key} `{name}` is already used by another queue"));
        }
    }

    if !config.queues.ready.ends_with(".fifo") {
        fail(format!(
            "queues.ready `{}` must be a FIFO queue (name ending in `.fifo`)",
            config.queues.ready
        ));
    }

    if config.queues.message_group_id.trim().is_empty() {
        fail("queues.message_group_id must not be empty".to_string());
    }

    if !(1..=10).contains(&config.worker.max_messages) {
        fail(format!(
            "worker.max_messages must be between 1 and 10, got {}",
            config.worker.max_messages
        ));
    }

    if config.relay.ack_timeout_secs == 0 {
        fail("relay.ack_timeout_secs must be greater than 0".to_string());
    }

    // A ready message must stay hidden for the whole ack wait.
    if config.relay.visibility_timeout_secs < config.relay.ack_timeout_secs {
        fail(format!(
            "relay.visibility_timeout_secs ({}) must be at least relay.ack_timeout_secs ({})",
            config.relay.visibility_timeout_secs, config.relay.ack_timeout_secs
        ));
    }

    if config.relay.stale_after_secs == 0 {
        fail("relay.stale_after_secs must be greater than 0".to_string());
    }

    if config.relay.sweep_interval_secs == 0 {
        fail("relay.sweep_interval_secs must be greater than 0".to_string());
    }

    if config.relay.broadcast_buffer == 0 || config.relay.client_buffer == 0 {
        fail("relay.broadcast_buffer and relay.client_buffer must be at least 1".to_string());
    }

    if config.relay.host.parse::<std::net::IpAddr>().is_err()
        && !config
            .relay
            .host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "relay.host `{}` is not a valid IP address or hostname",
            config.relay.host
        ));
    }

    if config.discord.enabled
        && (config.discord.bot_token.is_none() || config.discord.channel_id.is_none())
    {
        fail("discord.enabled requires discord.bot_token and discord.channel_id".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&SubvisionConfig::default()).is_ok());
    }

    #[test]
    fn ready_queue_must_be_fifo() {
        let mut config = SubvisionConfig::default();
        config.queues.ready = "ready".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "queues.ready"));
    }

    #[test]
    fn queue_names_must_be_distinct() {
        let mut config = SubvisionConfig::default();
        config.queues.dead_letter = config.queues.jobs.clone();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "already used"));
    }

    #[test]
    fn relay_visibility_must_cover_ack_wait() {
        let mut config = SubvisionConfig::default();
        config.relay.ack_timeout_secs = 10;
        config.relay.visibility_timeout_secs = 9;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "relay.visibility_timeout_secs"));

        config.relay.visibility_timeout_secs = 10;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn max_messages_out_of_range() {
        let mut config = SubvisionConfig::default();
        config.worker.max_messages = 11;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "worker.max_messages"));

        config.worker.max_messages = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn collects_every_error() {
        let mut config = SubvisionConfig::default();
        config.storage.database_path = " ".to_string();
        config.relay.ack_timeout_secs = 0;
        config.relay.stale_after_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn discord_requires_credentials_when_enabled() {
        let mut config = SubvisionConfig::default();
        config.discord.enabled = true;
        config.discord.bot_token = Some("token".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "discord.enabled"));

        config.discord.channel_id = Some("123".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
