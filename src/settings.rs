//! Flat, ordered settings maps with hierarchical dotted keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Reserved prefix under which unknown or invalid settings are preserved.
/// No real setting may be registered inside this namespace.
pub const ARCHIVED_SETTINGS_PREFIX: &str = "archived.";

/// The two independently-addressable configuration layers of a cluster.
/// Transient takes precedence over persistent when both define a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope {
    Persistent,
    Transient,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Persistent => "persistent",
            Scope::Transient => "transient",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable mapping from dotted string keys to string values.
///
/// An entry is either a concrete value or an explicit null marker. Null
/// markers only make sense in a *delta*: an exact key marked null deletes
/// that key, a key ending in `*` marked null bulk-deletes every match.
/// Settings stored in a snapshot never carry markers.
///
/// Keys iterate in lexicographic order. Serialized form is a flat JSON
/// object with `null` for markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    entries: BTreeMap<String, Option<String>>,
}

impl Settings {
    pub fn empty() -> Self {
        Settings::default()
    }

    pub fn builder() -> SettingsBuilder {
        SettingsBuilder {
            entries: BTreeMap::new(),
        }
    }

    /// Returns the concrete value for `key`, if any. Null markers and
    /// absent keys both yield `None`; use [`Settings::contains_key`] to
    /// tell them apart.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|v| v.as_deref())
    }

    /// True when `key` has a concrete (non-marker) value.
    pub fn has_value(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Some(_)))
    }

    /// True when `key` is present at all, as a value or a null marker.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries in key order; `None` values are null markers.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A new map retaining only the entries whose key satisfies `predicate`.
    pub fn filter(&self, predicate: impl Fn(&str) -> bool) -> Settings {
        Settings {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| predicate(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// The sub-map below `prefix`, with the prefix stripped from every key.
    pub fn by_prefix(&self, prefix: &str) -> Settings {
        Settings {
            entries: self
                .entries
                .iter()
                .filter_map(|(k, v)| {
                    k.strip_prefix(prefix)
                        .map(|rest| (rest.to_string(), v.clone()))
                })
                .collect(),
        }
    }

    pub fn get_as_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(parse_bool)
    }

    pub fn get_as_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn get_as_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn get_as_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn get_as_duration(&self, key: &str) -> Option<Duration> {
        self.get(key).and_then(parse_duration)
    }

    pub fn to_builder(&self) -> SettingsBuilder {
        SettingsBuilder {
            entries: self.entries.clone(),
        }
    }
}

/// Builder for [`Settings`]. Entries put later overwrite earlier ones.
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    pub(crate) entries: BTreeMap<String, Option<String>>,
}

impl SettingsBuilder {
    pub fn put(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.entries.insert(key.into(), Some(value.to_string()));
        self
    }

    /// Inserts an explicit null marker, the delta encoding for deletion.
    pub fn put_null(mut self, key: impl Into<String>) -> Self {
        self.entries.insert(key.into(), None);
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        self.entries.remove(key);
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Merges every entry of `other`, markers included, over this builder.
    pub fn put_settings(mut self, other: &Settings) -> Self {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn build(self) -> Settings {
        Settings {
            entries: self.entries,
        }
    }
}

/// Glob match with `*` standing for any run of characters, as used by
/// wildcard deletions. Literal characters must match exactly.
pub fn simple_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();
    let mut pi = 0;
    let mut ki = 0;
    let mut star: Option<usize> = None;
    let mut mark = 0;
    while ki < key.len() {
        if pi < pattern.len() && pattern[pi] == '*' {
            star = Some(pi);
            mark = ki;
            pi += 1;
        } else if pi < pattern.len() && pattern[pi] == key[ki] {
            pi += 1;
            ki += 1;
        } else if let Some(star_at) = star {
            pi = star_at + 1;
            mark += 1;
            ki = mark;
        } else {
            return false;
        }
    }
    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }
    pi == pattern.len()
}

/// Strict boolean literal parse: only `true` and `false` are accepted.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Parses a duration literal with a unit suffix: `ms`, `s`, `m`, `h` or `d`.
pub(crate) fn parse_duration(raw: &str) -> Option<Duration> {
    let (digits, multiplier_ms) = if let Some(rest) = raw.strip_suffix("ms") {
        (rest, 1u64)
    } else if let Some(rest) = raw.strip_suffix('s') {
        (rest, 1_000)
    } else if let Some(rest) = raw.strip_suffix('m') {
        (rest, 60_000)
    } else if let Some(rest) = raw.strip_suffix('h') {
        (rest, 3_600_000)
    } else if let Some(rest) = raw.strip_suffix('d') {
        (rest, 86_400_000)
    } else {
        return None;
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = digits.parse().ok()?;
    value.checked_mul(multiplier_ms).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_roundtrip_and_ordering() {
        let settings = Settings::builder()
            .put("zeta.key", "z")
            .put("alpha.key", 1.5)
            .put("mid.key", true)
            .build();
        let keys: Vec<&str> = settings.keys().collect();
        assert_eq!(keys, vec!["alpha.key", "mid.key", "zeta.key"]);
        assert_eq!(settings.get("alpha.key"), Some("1.5"));
        assert_eq!(settings.get("mid.key"), Some("true"));
        assert_eq!(settings.get("missing"), None);
    }

    #[test]
    fn null_markers_are_present_but_valueless() {
        let delta = Settings::builder()
            .put("keep", "v")
            .put_null("drop.me")
            .build();
        assert!(delta.contains_key("drop.me"));
        assert!(!delta.has_value("drop.me"));
        assert_eq!(delta.get("drop.me"), None);
        assert_eq!(delta.len(), 2);
        let entries: Vec<(&str, Option<&str>)> = delta.entries().collect();
        assert_eq!(entries, vec![("drop.me", None), ("keep", Some("v"))]);
    }

    #[test]
    fn put_overwrites_and_remove_drops() {
        let settings = Settings::builder()
            .put("a", "1")
            .put("a", "2")
            .put("b", "3")
            .remove("b")
            .build();
        assert_eq!(settings.get("a"), Some("2"));
        assert!(!settings.contains_key("b"));
    }

    #[test]
    fn put_settings_merges_markers_too() {
        let overlay = Settings::builder().put("a", "new").put_null("b").build();
        let merged = Settings::builder()
            .put("a", "old")
            .put("b", "old")
            .put("c", "old")
            .put_settings(&overlay)
            .build();
        assert_eq!(merged.get("a"), Some("new"));
        assert!(merged.contains_key("b") && !merged.has_value("b"));
        assert_eq!(merged.get("c"), Some("old"));
    }

    #[test]
    fn filter_and_by_prefix() {
        let settings = Settings::builder()
            .put("cluster.routing.balance.index", "1.5")
            .put("cluster.routing.balance.shard", "2.5")
            .put("cluster.blocks.read_only", "true")
            .build();
        let routing = settings.filter(|k| k.starts_with("cluster.routing."));
        assert_eq!(routing.len(), 2);
        let stripped = settings.by_prefix("cluster.routing.balance.");
        let keys: Vec<&str> = stripped.keys().collect();
        assert_eq!(keys, vec!["index", "shard"]);
        assert_eq!(stripped.get("index"), Some("1.5"));
    }

    #[test]
    fn typed_accessors() {
        let settings = Settings::builder()
            .put("flag", "true")
            .put("ratio", "0.4")
            .put("count", "42")
            .put("offset", "-7")
            .put("window", "30s")
            .put("junk", "wat")
            .build();
        assert_eq!(settings.get_as_bool("flag"), Some(true));
        assert_eq!(settings.get_as_f64("ratio"), Some(0.4));
        assert_eq!(settings.get_as_u64("count"), Some(42));
        assert_eq!(settings.get_as_i64("offset"), Some(-7));
        assert_eq!(
            settings.get_as_duration("window"),
            Some(Duration::from_secs(30))
        );
        assert_eq!(settings.get_as_bool("junk"), None);
        assert_eq!(settings.get_as_bool("absent"), None);
    }

    #[test]
    fn duration_literals() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7_200)));
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("s"), None);
        assert_eq!(parse_duration("-3s"), None);
        assert_eq!(parse_duration("3.5s"), None);
    }

    #[test]
    fn bool_literals_are_strict() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("True"), None);
        assert_eq!(parse_bool("1"), None);
    }

    #[test]
    fn glob_matching() {
        assert!(simple_match("cluster.routing.*", "cluster.routing.balance.index"));
        assert!(simple_match("*", "anything.at.all"));
        assert!(simple_match("exact.key", "exact.key"));
        assert!(!simple_match("exact.key", "exact.key.child"));
        assert!(simple_match("a.*.c", "a.b.c"));
        assert!(simple_match("a.*.c", "a.b.x.c"));
        assert!(!simple_match("a.*.c", "a.b.d"));
        assert!(simple_match("archived.*", "archived.old.setting"));
        assert!(!simple_match("cluster.*", "archived.cluster.key"));
        assert!(simple_match("**", "x"));
        assert!(simple_match("a*", "a"));
        assert!(!simple_match("a*b", "a"));
    }

    #[test]
    fn serde_flat_object_with_nulls() {
        let delta = Settings::builder()
            .put("balance.index", "0.5")
            .put_null("balance.shard")
            .build();
        let json = serde_json::to_string(&delta).expect("serialize");
        assert_eq!(json, r#"{"balance.index":"0.5","balance.shard":null}"#);
        let back: Settings = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, delta);
    }

    #[test]
    fn scope_labels() {
        assert_eq!(Scope::Persistent.to_string(), "persistent");
        assert_eq!(Scope::Transient.as_str(), "transient");
    }
}
