// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SubVision configuration system.

use subvision_config::diagnostic::ConfigError;
use subvision_config::model::SubvisionConfig;
use subvision_config::{load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[service]
name = "relay-a"
log_level = "debug"

[storage]
database_path = "/tmp/subvision-test.db"

[queues]
jobs = "jobs.fifo"
dead_letter = "jobs-dlq.fifo"
ready = "ready.fifo"
message_group_id = "0"

[worker]
max_messages = 5
wait_secs = 10
visibility_timeout_secs = 90

[relay]
port = 9000
ack_timeout_secs = 15
stale_after_secs = 300

[gemini]
api_key = "k"

[discord]
enabled = true
bot_token = "t"
channel_id = "42"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.service.name, "relay-a");
    assert_eq!(config.storage.database_path, "/tmp/subvision-test.db");
    assert_eq!(config.queues.ready, "ready.fifo");
    assert_eq!(config.worker.max_messages, 5);
    assert_eq!(config.worker.visibility_timeout().as_secs(), 90);
    assert_eq!(config.relay.port, 9000);
    assert_eq!(config.relay.ack_timeout().as_secs(), 15);
    assert_eq!(config.gemini.api_key.as_deref(), Some("k"));
    assert!(config.discord.enabled);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.queues.message_group_id, "0");
    assert_eq!(config.worker.max_messages, 10);
    assert_eq!(config.worker.wait_secs, 20);
    assert_eq!(config.worker.visibility_timeout_secs, 60);
    assert_eq!(config.worker.error_backoff_secs, 5);
    assert_eq!(config.worker.poll_delay_ms, 500);
    assert_eq!(config.relay.visibility_timeout_secs, 30);
    assert_eq!(config.relay.ack_timeout_secs, 10);
    assert_eq!(config.relay.idle_delay_ms, 1000);
    assert_eq!(config.relay.sweep_interval_secs, 60);
    assert_eq!(config.relay.stale_after_secs, 120);
    assert_eq!(config.relay.broadcast_buffer, 1);
    assert_eq!(config.relay.image_path_prefix, "/output_images/");
    assert_eq!(config.relay.submission_cooldown_secs, 10);
    assert!(!config.discord.enabled);
}

#[test]
fn unknown_key_is_rejected_with_suggestion() {
    let toml = r#"
[relay]
ack_timout_secs = 5
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown key should fail");
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey { key, suggestion, .. } if key == "ack_timout_secs" => {
            suggestion.clone()
        }
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("ack_timeout_secs"));
}

#[test]
fn invalid_type_is_reported() {
    let toml = r#"
[worker]
max_messages = "ten"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = err.to_string();
    assert!(
        err_str.contains("invalid type") || err_str.contains("max_messages"),
        "error should mention type mismatch, got: {err_str}"
    );
}

#[test]
fn dotted_override_maps_to_section_field() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: SubvisionConfig = Figment::new()
        .merge(Serialized::defaults(SubvisionConfig::default()))
        .merge(Toml::string("[relay]\nport = 9000\n"))
        .merge(("relay.ack_timeout_secs", 3))
        .extract()
        .expect("should merge override");

    assert_eq!(config.relay.port, 9000);
    assert_eq!(config.relay.ack_timeout_secs, 3);
}

#[test]
fn validation_errors_surface_through_loader() {
    let toml = r#"
[queues]
ready = "ready"

[worker]
max_messages = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("invalid values should fail");
    assert!(errors.len() >= 2);
    assert!(errors.iter().all(|e| matches!(e, ConfigError::Validation { .. })));
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{GraphicalReportHandler, GraphicalTheme};

    let error = ConfigError::UnknownKey {
        key: "prot".to_string(),
        suggestion: Some("port".to_string()),
        valid_keys: "host, port".to_string(),
        span: None,
        src: None,
    };

    let mut buf = String::new();
    GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("prot"));
    assert!(buf.contains("did you mean `port`"));
}
