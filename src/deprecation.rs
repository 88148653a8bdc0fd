//! Deprecation scanning over the settings maps of a freshly built snapshot.

use crate::registry::SettingRegistry;
use crate::settings::{ARCHIVED_SETTINGS_PREFIX, Settings};
use log::warn;
use serde::Serialize;
use std::collections::BTreeSet;

/// A notice that a deprecated setting is still in use. Returned to the
/// caller and logged; keys are reported in lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeprecationWarning {
    pub key: String,
    pub message: String,
}

impl DeprecationWarning {
    fn for_key(key: &str) -> Self {
        DeprecationWarning {
            key: key.to_string(),
            message: format!(
                "setting [{key}] is deprecated and will be removed in a future release"
            ),
        }
    }
}

/// One warning per distinct deprecated key present in either scope, on every
/// call. Repeat calls with identical inputs warn again; there is no
/// cross-call suppression. Archived entries are never scanned.
pub fn scan(
    registry: &SettingRegistry,
    persistent: &Settings,
    transient: &Settings,
) -> Vec<DeprecationWarning> {
    let keys: BTreeSet<&str> = transient
        .keys()
        .chain(persistent.keys())
        .filter(|key| !key.starts_with(ARCHIVED_SETTINGS_PREFIX))
        .collect();
    let mut warnings = Vec::new();
    for key in keys {
        let deprecated = registry
            .lookup(key)
            .is_some_and(|definition| definition.is_deprecated());
        if deprecated {
            let warning = DeprecationWarning::for_key(key);
            warn!("event=setting_deprecated key={}", warning.key);
            warnings.push(warning);
        }
    }
    warnings
}
