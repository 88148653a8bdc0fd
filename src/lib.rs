//! Settra: a cluster settings update engine.
//! Takes two-scope (persistent/transient) settings deltas, validates them
//! atomically against a registry, archives stale carried-forward keys, and
//! derives the operational block set for each new cluster snapshot.

pub mod blocks;
pub mod catalog;
pub mod deprecation;
pub mod registry;
pub mod settings;
pub mod snapshot;
pub mod source;
pub mod updater;

pub use blocks::{
    derive_blocks, BlockLevel, CLUSTER_READ_ONLY_ALLOW_DELETE_BLOCK, CLUSTER_READ_ONLY_BLOCK,
    ClusterBlock, ClusterBlocks, SETTING_READ_ONLY, SETTING_READ_ONLY_ALLOW_DELETE,
};
pub use catalog::builtin_settings;
pub use deprecation::DeprecationWarning;
pub use registry::{
    InvalidSettingValue, RegistryError, SettingDefinition, SettingKey, SettingKind,
    SettingRegistry, SettingScope, SettingValidator, SettingValue,
};
pub use settings::{simple_match, ARCHIVED_SETTINGS_PREFIX, Scope, Settings, SettingsBuilder};
pub use snapshot::{ClusterSnapshot, ClusterSnapshotBuilder};
pub use source::{settings_from_json, settings_from_json_str, SourceError};
pub use updater::{SettingsUpdateOutcome, SettingsUpdater};
