// SPDX-FileCopyrightText: 2026 SubVision Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./subvision.toml` > `~/.config/subvision/subvision.toml`
//! > `/etc/subvision/subvision.toml` with environment variable overrides via the
//! `SUBVISION_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SubvisionConfig;

/// Section names, used to turn `SUBVISION_WORKER_MAX_MESSAGES` into
/// `worker.max_messages`.
const SECTIONS: &[&str] = &[
    "service", "storage", "queues", "worker", "relay", "gemini", "discord",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/subvision/subvision.toml` (system-wide)
/// 3. `~/.config/subvision/subvision.toml` (user XDG config)
/// 4. `./subvision.toml` (local directory)
/// 5. `SUBVISION_*` environment variables
pub fn load_config() -> Result<SubvisionConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SubvisionConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SubvisionConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SubvisionConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SubvisionConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SubvisionConfig::default()))
        .merge(Toml::file("/etc/subvision/subvision.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("subvision/subvision.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("subvision.toml"))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env var name onto a dotted config key.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `relay_ack_timeout_secs` maps to `relay.ack_timeout_secs`.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("SUBVISION_").map(|key| map_env_key(key.as_str()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_only_at_section() {
        assert_eq!(map_env_key("relay_ack_timeout_secs"), "relay.ack_timeout_secs");
        assert_eq!(map_env_key("queues_dead_letter"), "queues.dead_letter");
        assert_eq!(map_env_key("discord_bot_token"), "discord.bot_token");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
    }

    #[test]
    fn unknown_section_passes_through() {
        assert_eq!(map_env_key("something_else"), "something_else");
    }
}
