//! Built-in cluster setting definitions.
//!
//! A starting set covering the knobs the engine itself gives meaning to
//! (the block toggles) plus the common operational ones, so embedders and
//! tests begin from a populated registry. Feed these to
//! [`SettingRegistry::with_settings`](crate::registry::SettingRegistry::with_settings)
//! and register domain-specific definitions on top.

use crate::blocks::{SETTING_READ_ONLY, SETTING_READ_ONLY_ALLOW_DELETE};
use crate::registry::{SettingDefinition, SettingKey, SettingKind};

pub const SETTING_BALANCE_INDEX: &str = "cluster.routing.allocation.balance.index";
pub const SETTING_BALANCE_SHARD: &str = "cluster.routing.allocation.balance.shard";
pub const SETTING_BALANCE_THRESHOLD: &str = "cluster.routing.allocation.balance.threshold";
pub const SETTING_ALLOCATION_ENABLE: &str = "cluster.routing.allocation.enable";
pub const SETTING_RECOVERY_MAX_BYTES_PER_SEC: &str = "indices.recovery.max_bytes_per_sec";
pub const SETTING_INITIAL_STATE_TIMEOUT: &str = "discovery.initial_state_timeout";
pub const SETTING_INFO_UPDATE_INTERVAL: &str = "cluster.info.update.interval";

/// Group prefix for per-component log levels (`logger.<component>`).
pub const SETTING_LOGGER_PREFIX: &str = "logger.";

pub fn builtin_settings() -> Vec<SettingDefinition> {
    vec![
        SettingDefinition::new(SETTING_BALANCE_INDEX, SettingKind::Float)
            .dynamic()
            .with_default("0.55"),
        SettingDefinition::new(SETTING_BALANCE_SHARD, SettingKind::Float)
            .dynamic()
            .with_default("0.45"),
        SettingDefinition::new(SETTING_BALANCE_THRESHOLD, SettingKind::Float)
            .dynamic()
            .with_default("1.0")
            .with_validator(non_negative),
        SettingDefinition::new(SETTING_ALLOCATION_ENABLE, SettingKind::Text)
            .dynamic()
            .with_default("all")
            .with_validator(allocation_mode),
        SettingDefinition::new(SETTING_READ_ONLY, SettingKind::Bool)
            .dynamic()
            .with_default("false"),
        SettingDefinition::new(SETTING_READ_ONLY_ALLOW_DELETE, SettingKind::Bool)
            .dynamic()
            .with_default("false"),
        SettingDefinition::new(SETTING_RECOVERY_MAX_BYTES_PER_SEC, SettingKind::Text)
            .dynamic()
            .with_default("40mb"),
        SettingDefinition::new(SETTING_INITIAL_STATE_TIMEOUT, SettingKind::Duration)
            .with_default("30s"),
        SettingDefinition::new(SETTING_INFO_UPDATE_INTERVAL, SettingKind::Duration)
            .dynamic()
            .with_default("30s"),
        SettingDefinition::new(SettingKey::prefix(SETTING_LOGGER_PREFIX), SettingKind::Text)
            .dynamic()
            .with_validator(log_level),
    ]
}

fn non_negative(raw: &str) -> Result<(), String> {
    match raw.parse::<f64>() {
        Ok(value) if value >= 0.0 => Ok(()),
        _ => Err("must be a non-negative number".to_string()),
    }
}

fn allocation_mode(raw: &str) -> Result<(), String> {
    match raw {
        "all" | "primaries" | "new_primaries" | "none" => Ok(()),
        other => Err(format!("unknown allocation mode [{other}]")),
    }
}

fn log_level(raw: &str) -> Result<(), String> {
    match raw {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(()),
        other => Err(format!("unknown log level [{other}]")),
    }
}
