//! The settings update pipeline: delta resolution, validation, archival,
//! block derivation and snapshot assembly.

use crate::blocks::derive_blocks;
use crate::deprecation::{self, DeprecationWarning};
use crate::registry::{InvalidSettingValue, SettingRegistry};
use crate::settings::{simple_match, ARCHIVED_SETTINGS_PREFIX, Scope, Settings};
use crate::snapshot::ClusterSnapshot;
use log::warn;
use serde::Serialize;
use std::collections::BTreeSet;

/// Applies two-scope settings deltas to a cluster snapshot.
///
/// The updater is a pure function over its inputs: it holds no mutable
/// state, performs no I/O beyond logging, and either returns a freshly
/// built snapshot or an error with the inputs untouched. Serializing
/// concurrent writers against the authoritative current snapshot is the
/// caller's job.
#[derive(Debug, Clone, Copy)]
pub struct SettingsUpdater<'a> {
    registry: &'a SettingRegistry,
}

/// Everything one successful update produced.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsUpdateOutcome {
    /// The replacement snapshot. Cluster name and version carry over from
    /// the input; the two settings maps and the block set are rebuilt.
    pub snapshot: ClusterSnapshot,
    /// Whether either scope's content differs from the input snapshot,
    /// archival relocations included.
    pub changed: bool,
    /// Delta entries actually applied to the transient scope; removals
    /// appear as null markers.
    pub transient_updates: Settings,
    /// Delta entries actually applied to the persistent scope.
    pub persistent_updates: Settings,
    /// Deprecated keys still present after the update, in key order.
    pub deprecations: Vec<DeprecationWarning>,
}

struct ScopeChange {
    candidate: Settings,
    updates: Settings,
    explicit: BTreeSet<String>,
}

impl<'a> SettingsUpdater<'a> {
    pub fn new(registry: &'a SettingRegistry) -> Self {
        SettingsUpdater { registry }
    }

    /// Resolves, validates and applies the two deltas against `current`.
    ///
    /// Both scopes run the same pipeline, transient first. Validation
    /// covers only the keys a delta explicitly names; any failure aborts
    /// the whole call before anything is built. Keys merely carried
    /// forward are never rejected: if they turned unknown or invalid they
    /// move under `archived.` with their value intact. A new snapshot is
    /// returned even when nothing changed.
    pub fn update_settings(
        &self,
        current: &ClusterSnapshot,
        transient_to_apply: &Settings,
        persistent_to_apply: &Settings,
    ) -> Result<SettingsUpdateOutcome, InvalidSettingValue> {
        let transient =
            self.apply_scope(Scope::Transient, current.transient(), transient_to_apply)?;
        let persistent =
            self.apply_scope(Scope::Persistent, current.persistent(), persistent_to_apply)?;

        let new_transient =
            self.archive_stale(Scope::Transient, &transient.candidate, &transient.explicit);
        let new_persistent = self.archive_stale(
            Scope::Persistent,
            &persistent.candidate,
            &persistent.explicit,
        );

        let blocks = derive_blocks(current.blocks(), &new_persistent, &new_transient);
        let deprecations = deprecation::scan(self.registry, &new_persistent, &new_transient);
        let changed = new_transient != *current.transient()
            || new_persistent != *current.persistent();

        let snapshot = current
            .to_builder()
            .persistent(new_persistent)
            .transient(new_transient)
            .blocks(blocks)
            .build();

        Ok(SettingsUpdateOutcome {
            snapshot,
            changed,
            transient_updates: transient.updates,
            persistent_updates: persistent.updates,
            deprecations,
        })
    }

    /// One scope's delta resolution: validate every explicitly named key,
    /// then apply deletions (exact and wildcard) followed by assignments,
    /// so an assignment always wins over a wildcard in the same call.
    fn apply_scope(
        &self,
        scope: Scope,
        existing: &Settings,
        delta: &Settings,
    ) -> Result<ScopeChange, InvalidSettingValue> {
        for (key, value) in delta.entries() {
            match value {
                Some(raw) => self.validate_assignment(scope, key, raw)?,
                None if key.ends_with('*') => {}
                None => self.validate_exact_delete(scope, key)?,
            }
        }

        let mut explicit: BTreeSet<String> = BTreeSet::new();
        let mut removed: BTreeSet<String> = BTreeSet::new();
        for (key, value) in delta.entries() {
            match value {
                Some(_) => {
                    explicit.insert(key.to_string());
                }
                None if key.ends_with('*') => {
                    for stored in existing.keys().filter(|stored| wildcard_hits(key, stored)) {
                        removed.insert(stored.to_string());
                    }
                }
                None => {
                    explicit.insert(key.to_string());
                    if existing.contains_key(key) {
                        removed.insert(key.to_string());
                    }
                }
            }
        }
        explicit.extend(removed.iter().cloned());

        let mut candidate = existing.to_builder();
        let mut updates = Settings::builder();
        for key in &removed {
            candidate = candidate.remove(key);
            updates = updates.put_null(key);
        }
        for (key, value) in delta.entries() {
            if let Some(raw) = value {
                candidate = candidate.put(key, raw);
                updates = updates.put(key, raw);
            }
        }

        Ok(ScopeChange {
            candidate: candidate.build(),
            updates: updates.build(),
            explicit,
        })
    }

    fn validate_assignment(
        &self,
        scope: Scope,
        key: &str,
        raw: &str,
    ) -> Result<(), InvalidSettingValue> {
        let Some(definition) = self.registry.lookup(key) else {
            return Err(InvalidSettingValue::NotRecognized {
                scope,
                key: key.to_string(),
                value: Some(raw.to_string()),
            });
        };
        if !definition.scope().covers(scope) {
            return Err(InvalidSettingValue::ScopeMismatch {
                scope,
                key: key.to_string(),
                value: raw.to_string(),
            });
        }
        if !definition.is_dynamic() {
            return Err(InvalidSettingValue::NotDynamic {
                scope,
                key: key.to_string(),
                value: Some(raw.to_string()),
            });
        }
        definition.validate(key, raw).map(|_| ())
    }

    /// An exact deletion must target a dynamic registered key; the only
    /// unregistered keys it may touch are already-archived ones.
    fn validate_exact_delete(&self, scope: Scope, key: &str) -> Result<(), InvalidSettingValue> {
        if key.starts_with(ARCHIVED_SETTINGS_PREFIX) {
            return Ok(());
        }
        let Some(definition) = self.registry.lookup(key) else {
            return Err(InvalidSettingValue::NotRecognized {
                scope,
                key: key.to_string(),
                value: None,
            });
        };
        if !definition.is_dynamic() {
            return Err(InvalidSettingValue::NotDynamic {
                scope,
                key: key.to_string(),
                value: None,
            });
        }
        Ok(())
    }

    /// Relocates carried-forward keys that are unknown to the registry or
    /// fail validation under the archival prefix, value intact. Keys the
    /// delta named are exempt; they were validated already. Never raises.
    ///
    /// A logical key ends up in at most one namespace: re-establishing a
    /// normal key drops its archived twin, and archiving a key overwrites
    /// an older archived twin. Both cases are logged, never silent.
    fn archive_stale(
        &self,
        scope: Scope,
        resolved: &Settings,
        explicit: &BTreeSet<String>,
    ) -> Settings {
        let mut keep: BTreeSet<&str> = BTreeSet::new();
        let mut stale: Vec<(&str, &str)> = Vec::new();
        for (key, value) in resolved.entries() {
            let Some(raw) = value else { continue };
            if key.starts_with(ARCHIVED_SETTINGS_PREFIX) {
                continue;
            }
            if explicit.contains(key) {
                keep.insert(key);
                continue;
            }
            match self.registry.lookup(key) {
                Some(definition) => match definition.validate(key, raw) {
                    Ok(_) => {
                        keep.insert(key);
                    }
                    Err(err) => {
                        warn!(
                            "event=setting_archived scope={scope} key={key} value={raw} reason=invalid error={err}"
                        );
                        stale.push((key, raw));
                    }
                },
                None => {
                    warn!("event=setting_archived scope={scope} key={key} value={raw} reason=unknown");
                    stale.push((key, raw));
                }
            }
        }

        let mut builder = Settings::builder();
        for (key, value) in resolved.entries() {
            let Some(raw) = value else { continue };
            match key.strip_prefix(ARCHIVED_SETTINGS_PREFIX) {
                Some(logical) if keep.contains(logical) => {
                    warn!(
                        "event=archived_setting_dropped scope={scope} key={key} reason=normal_key_present"
                    );
                }
                Some(_) => builder = builder.put(key, raw),
                None if keep.contains(key) => builder = builder.put(key, raw),
                None => {}
            }
        }
        for (key, raw) in stale {
            let archived_key = format!("{ARCHIVED_SETTINGS_PREFIX}{key}");
            if builder.contains_key(&archived_key) {
                warn!("event=archived_setting_replaced scope={scope} key={archived_key}");
            }
            builder = builder.put(archived_key, raw);
        }
        builder.build()
    }
}

/// A wildcard pattern hits a stored key if the key itself matches, or, for
/// archived keys, if the original un-prefixed key matches.
fn wildcard_hits(pattern: &str, stored: &str) -> bool {
    if simple_match(pattern, stored) {
        return true;
    }
    stored
        .strip_prefix(ARCHIVED_SETTINGS_PREFIX)
        .is_some_and(|logical| simple_match(pattern, logical))
}
