//! Setting definitions and the read-only registry the update engine consults.

use crate::settings::{parse_bool, parse_duration, ARCHIVED_SETTINGS_PREFIX, Scope};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// A validated, typed setting value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Duration(Duration),
    Text(String),
}

/// The value shape of a setting. Each kind knows how to turn a raw string
/// into a [`SettingValue`] or fail with the canonical parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SettingKind {
    Bool,
    Int,
    Uint,
    Float,
    Duration,
    Text,
}

impl SettingKind {
    pub fn parse(&self, key: &str, raw: &str) -> Result<SettingValue, InvalidSettingValue> {
        let parsed = match self {
            SettingKind::Bool => parse_bool(raw).map(SettingValue::Bool),
            SettingKind::Int => raw.parse().ok().map(SettingValue::Int),
            SettingKind::Uint => raw.parse().ok().map(SettingValue::Uint),
            SettingKind::Float => raw.parse().ok().map(SettingValue::Float),
            SettingKind::Duration => parse_duration(raw).map(SettingValue::Duration),
            SettingKind::Text => Some(SettingValue::Text(raw.to_string())),
        };
        parsed.ok_or_else(|| InvalidSettingValue::ParseFailed {
            key: key.to_string(),
            value: raw.to_string(),
        })
    }
}

/// Registry key: either one exact dotted key or a group prefix (trailing
/// dot) under which any concrete key is governed by the same definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SettingKey {
    Exact(String),
    Prefix(String),
}

impl SettingKey {
    pub fn exact(key: impl Into<String>) -> Self {
        SettingKey::Exact(key.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        SettingKey::Prefix(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            SettingKey::Exact(key) => key,
            SettingKey::Prefix(prefix) => prefix,
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            SettingKey::Exact(exact) => exact == key,
            SettingKey::Prefix(prefix) => {
                key.len() > prefix.len() && key.starts_with(prefix.as_str())
            }
        }
    }
}

impl From<&str> for SettingKey {
    fn from(key: &str) -> Self {
        SettingKey::Exact(key.to_string())
    }
}

impl From<String> for SettingKey {
    fn from(key: String) -> Self {
        SettingKey::Exact(key)
    }
}

/// Which scopes a setting may live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SettingScope {
    Persistent,
    Transient,
    Both,
}

impl SettingScope {
    pub fn covers(&self, scope: Scope) -> bool {
        match self {
            SettingScope::Both => true,
            SettingScope::Persistent => scope == Scope::Persistent,
            SettingScope::Transient => scope == Scope::Transient,
        }
    }
}

/// Extra validation layered on top of the kind parser. The reported reason
/// ends up verbatim in [`InvalidSettingValue::Rejected`].
pub type SettingValidator = fn(&str) -> Result<(), String>;

/// One registry entry: key or group prefix, value kind, scope applicability,
/// dynamic and deprecated flags, optional default and custom validator.
#[derive(Debug, Clone)]
pub struct SettingDefinition {
    key: SettingKey,
    kind: SettingKind,
    scope: SettingScope,
    dynamic: bool,
    deprecated: bool,
    default: Option<String>,
    validator: Option<SettingValidator>,
}

impl SettingDefinition {
    /// A fixed (non-dynamic), non-deprecated definition applicable to both
    /// scopes. Flags are opted into through the chainable setters.
    pub fn new(key: impl Into<SettingKey>, kind: SettingKind) -> Self {
        Self {
            key: key.into(),
            kind,
            scope: SettingScope::Both,
            dynamic: false,
            deprecated: false,
            default: None,
            validator: None,
        }
    }

    pub fn with_scope(mut self, scope: SettingScope) -> Self {
        self.scope = scope;
        self
    }

    /// Marks the setting as updatable after startup.
    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn with_default(mut self, raw: impl Into<String>) -> Self {
        self.default = Some(raw.into());
        self
    }

    pub fn with_validator(mut self, validator: SettingValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn key(&self) -> &SettingKey {
        &self.key
    }

    pub fn kind(&self) -> SettingKind {
        self.kind
    }

    pub fn scope(&self) -> SettingScope {
        self.scope
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    /// Raw default, used by effective-value resolution when a key is absent
    /// from both scopes.
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Parses `raw` through the kind, then through the custom validator if
    /// one is attached. `key` is the concrete key being validated, which for
    /// a group definition differs from the registered prefix.
    pub fn validate(&self, key: &str, raw: &str) -> Result<SettingValue, InvalidSettingValue> {
        let value = self.kind.parse(key, raw)?;
        if let Some(validator) = self.validator {
            validator(raw).map_err(|reason| InvalidSettingValue::Rejected {
                key: key.to_string(),
                value: raw.to_string(),
                reason,
            })?;
        }
        Ok(value)
    }
}

/// The one error kind an update can fail with. Raised only for keys the
/// caller's delta explicitly named; carried-forward keys are archived
/// instead. Any of these aborts both scopes with no partial application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSettingValue {
    #[error("Failed to parse value [{value}] for setting [{key}]")]
    ParseFailed { key: String, value: String },
    #[error("invalid value [{value}] for setting [{key}]: {reason}")]
    Rejected {
        key: String,
        value: String,
        reason: String,
    },
    #[error("{scope} setting [{key}], not recognized")]
    NotRecognized {
        scope: Scope,
        key: String,
        value: Option<String>,
    },
    #[error("{scope} setting [{key}], not dynamically updatable")]
    NotDynamic {
        scope: Scope,
        key: String,
        value: Option<String>,
    },
    #[error("setting [{key}] is not applicable to the {scope} scope")]
    ScopeMismatch {
        scope: Scope,
        key: String,
        value: String,
    },
}

impl InvalidSettingValue {
    /// The offending key.
    pub fn key(&self) -> &str {
        match self {
            InvalidSettingValue::ParseFailed { key, .. }
            | InvalidSettingValue::Rejected { key, .. }
            | InvalidSettingValue::NotRecognized { key, .. }
            | InvalidSettingValue::NotDynamic { key, .. }
            | InvalidSettingValue::ScopeMismatch { key, .. } => key,
        }
    }

    /// The offending raw value, when the delta supplied one (deletions
    /// carry none).
    pub fn value(&self) -> Option<&str> {
        match self {
            InvalidSettingValue::ParseFailed { value, .. }
            | InvalidSettingValue::Rejected { value, .. }
            | InvalidSettingValue::ScopeMismatch { value, .. } => Some(value),
            InvalidSettingValue::NotRecognized { value, .. }
            | InvalidSettingValue::NotDynamic { value, .. } => value.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("setting [{key}] is already registered")]
    DuplicateKey { key: String },
    #[error("setting [{key}] collides with the reserved archival namespace")]
    ReservedPrefix { key: String },
    #[error("group setting [{key}] must end with a trailing dot")]
    InvalidPrefix { key: String },
}

/// Immutable map from setting key or group prefix to definition. Built once
/// at startup and handed to the updater by reference; never mutated by it.
#[derive(Debug, Clone, Default)]
pub struct SettingRegistry {
    exact: BTreeMap<String, SettingDefinition>,
    prefixes: BTreeMap<String, SettingDefinition>,
}

impl SettingRegistry {
    pub fn new() -> Self {
        SettingRegistry::default()
    }

    pub fn with_settings(
        definitions: impl IntoIterator<Item = SettingDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut registry = SettingRegistry::new();
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, definition: SettingDefinition) -> Result<(), RegistryError> {
        let key = definition.key().as_str().to_string();
        if key.starts_with(ARCHIVED_SETTINGS_PREFIX) {
            return Err(RegistryError::ReservedPrefix { key });
        }
        match definition.key() {
            SettingKey::Exact(_) => {
                if self.exact.contains_key(&key) {
                    return Err(RegistryError::DuplicateKey { key });
                }
                self.exact.insert(key, definition);
            }
            SettingKey::Prefix(_) => {
                if !key.ends_with('.') {
                    return Err(RegistryError::InvalidPrefix { key });
                }
                if self.prefixes.contains_key(&key) {
                    return Err(RegistryError::DuplicateKey { key });
                }
                self.prefixes.insert(key, definition);
            }
        }
        Ok(())
    }

    /// The definition governing `key`: an exact entry wins over any group
    /// prefix; among matching prefixes the longest wins.
    pub fn lookup(&self, key: &str) -> Option<&SettingDefinition> {
        if let Some(definition) = self.exact.get(key) {
            return Some(definition);
        }
        self.prefixes
            .iter()
            .filter(|(_, definition)| definition.key().matches(key))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, definition)| definition)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &SettingDefinition> {
        self.exact.values().chain(self.prefixes.values())
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parse_produces_typed_values() {
        assert_eq!(
            SettingKind::Bool.parse("k", "true"),
            Ok(SettingValue::Bool(true))
        );
        assert_eq!(SettingKind::Int.parse("k", "-9"), Ok(SettingValue::Int(-9)));
        assert_eq!(SettingKind::Uint.parse("k", "9"), Ok(SettingValue::Uint(9)));
        assert_eq!(
            SettingKind::Float.parse("k", "0.4"),
            Ok(SettingValue::Float(0.4))
        );
        assert_eq!(
            SettingKind::Duration.parse("k", "90s"),
            Ok(SettingValue::Duration(Duration::from_secs(90)))
        );
        assert_eq!(
            SettingKind::Text.parse("k", "anything"),
            Ok(SettingValue::Text("anything".to_string()))
        );
    }

    #[test]
    fn kind_parse_failure_uses_canonical_message() {
        let err = SettingKind::Float
            .parse("cluster.routing.allocation.balance.index", "not a float")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to parse value [not a float] for setting [cluster.routing.allocation.balance.index]"
        );
        assert_eq!(err.key(), "cluster.routing.allocation.balance.index");
        assert_eq!(err.value(), Some("not a float"));
    }

    #[test]
    fn custom_validator_rejects_with_reason() {
        fn allocation_mode(raw: &str) -> Result<(), String> {
            match raw {
                "all" | "primaries" | "none" => Ok(()),
                other => Err(format!("unknown allocation mode [{other}]")),
            }
        }
        let definition = SettingDefinition::new("alloc.mode", SettingKind::Text)
            .dynamic()
            .with_validator(allocation_mode);
        assert_eq!(
            definition.validate("alloc.mode", "all"),
            Ok(SettingValue::Text("all".to_string()))
        );
        let err = definition.validate("alloc.mode", "some").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value [some] for setting [alloc.mode]: unknown allocation mode [some]"
        );
    }

    #[test]
    fn lookup_prefers_exact_then_longest_prefix() {
        let registry = SettingRegistry::with_settings([
            SettingDefinition::new(SettingKey::prefix("logger."), SettingKind::Text).dynamic(),
            SettingDefinition::new(SettingKey::prefix("logger.net."), SettingKind::Text),
            SettingDefinition::new("logger.net.raft", SettingKind::Bool),
        ])
        .expect("registry builds");

        let exact = registry.lookup("logger.net.raft").expect("exact hit");
        assert_eq!(exact.kind(), SettingKind::Bool);

        let long = registry.lookup("logger.net.http").expect("longest prefix");
        assert_eq!(long.key().as_str(), "logger.net.");

        let short = registry.lookup("logger.root").expect("short prefix");
        assert_eq!(short.key().as_str(), "logger.");
        assert!(short.is_dynamic());

        // the bare group key itself names no setting
        assert!(registry.lookup("logger.").is_none());
        assert!(registry.lookup("unrelated.key").is_none());
    }

    #[test]
    fn registration_guards() {
        let mut registry = SettingRegistry::new();
        registry
            .register(SettingDefinition::new("a.b", SettingKind::Text))
            .expect("first registration");
        assert_eq!(
            registry.register(SettingDefinition::new("a.b", SettingKind::Bool)),
            Err(RegistryError::DuplicateKey {
                key: "a.b".to_string()
            })
        );
        assert_eq!(
            registry.register(SettingDefinition::new("archived.a", SettingKind::Text)),
            Err(RegistryError::ReservedPrefix {
                key: "archived.a".to_string()
            })
        );
        assert_eq!(
            registry.register(SettingDefinition::new(
                SettingKey::prefix("group"),
                SettingKind::Text
            )),
            Err(RegistryError::InvalidPrefix {
                key: "group".to_string()
            })
        );
    }

    #[test]
    fn scope_applicability() {
        assert!(SettingScope::Both.covers(Scope::Persistent));
        assert!(SettingScope::Both.covers(Scope::Transient));
        assert!(SettingScope::Persistent.covers(Scope::Persistent));
        assert!(!SettingScope::Persistent.covers(Scope::Transient));
        assert!(!SettingScope::Transient.covers(Scope::Persistent));
    }

    #[test]
    fn definition_flags_and_default() {
        let definition = SettingDefinition::new("d", SettingKind::Float)
            .dynamic()
            .deprecated()
            .with_default("1.5")
            .with_scope(SettingScope::Persistent);
        assert!(definition.is_dynamic());
        assert!(definition.is_deprecated());
        assert_eq!(definition.default_value(), Some("1.5"));
        assert_eq!(definition.scope(), SettingScope::Persistent);
    }
}
