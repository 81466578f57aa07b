//! Persisted per-binding user overrides
//!
//! The binding list records, for every binding key seen in the last run,
//! whether it is enabled, an optional rename and whether an exported wrapper is
//! generated. Users edit it by hand; runs only add new keys, refresh the stored
//! doc strings and drop missing keys that carry no user setting.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::binding::BindingKey;
use crate::error::CoreError;

fn default_enabled() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedOverride {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exported: bool,
    /// Doc string of the binding when the list was last written, for diffing.
    #[serde(default)]
    pub doc: String,
}

impl PersistedOverride {
    /// Whether any user-controlled field differs from its default.
    pub fn is_customized(&self) -> bool {
        !self.enabled || self.rename.is_some() || self.exported
    }
}

impl Default for PersistedOverride {
    fn default() -> Self {
        Self {
            enabled: true,
            rename: None,
            exported: false,
            doc: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub removed: usize,
    pub changed_docs: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingList {
    #[serde(default)]
    pub bindings: BTreeMap<BindingKey, PersistedOverride>,
}

impl BindingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &BindingKey) -> Option<&PersistedOverride> {
        self.bindings.get(key)
    }

    /// Unknown keys are enabled.
    pub fn is_enabled(&self, key: &BindingKey) -> bool {
        self.get(key).map_or(true, |o| o.enabled)
    }

    pub fn rename(&self, key: &BindingKey) -> Option<&str> {
        self.get(key).and_then(|o| o.rename.as_deref())
    }

    pub fn is_exported(&self, key: &BindingKey) -> bool {
        self.get(key).is_some_and(|o| o.exported)
    }

    /// Brings the list in line with the current set of bindings. User fields
    /// are never touched. Entries missing from `current` are dropped only when
    /// they carry no user setting, so an override survives a run in which its
    /// symbol failed to generate.
    pub fn reconcile(&mut self, current: &BTreeMap<BindingKey, String>) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        let before = self.bindings.len();
        self.bindings.retain(|key, entry| {
            let keep = current.contains_key(key) || entry.is_customized();
            if !keep {
                debug!("dropping stale entry {}", key);
            }
            keep
        });
        summary.removed = before - self.bindings.len();

        for (key, doc) in current {
            match self.bindings.get_mut(key) {
                Some(entry) => {
                    if entry.doc != *doc {
                        debug!("doc changed for {}", key);
                        entry.doc = doc.clone();
                        summary.changed_docs += 1;
                    }
                }
                None => {
                    self.bindings.insert(
                        key.clone(),
                        PersistedOverride {
                            doc: doc.clone(),
                            ..PersistedOverride::default()
                        },
                    );
                    summary.added += 1;
                }
            }
        }
        summary
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Storage for the binding list, read at run start and rewritten at run end.
pub trait BindingStore {
    fn load(&self) -> Result<BindingList, CoreError>;
    fn save(&self, list: &BindingList) -> Result<(), CoreError>;
}

/// Binding list kept as a TOML file. A missing file is an empty list.
#[derive(Debug, Clone)]
pub struct TomlBindingStore {
    path: PathBuf,
}

impl TomlBindingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BindingStore for TomlBindingStore {
    fn load(&self) -> Result<BindingList, CoreError> {
        if !self.path.exists() {
            debug!("no binding list at {}, starting empty", self.path.display());
            return Ok(BindingList::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| CoreError::io(&self.path, e))?;
        toml::from_str(&content).map_err(|e| CoreError::BindingList {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn save(&self, list: &BindingList) -> Result<(), CoreError> {
        let content = toml::to_string_pretty(list).map_err(|e| CoreError::BindingList {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let header = "# Per-binding overrides: set enabled = false to skip a binding,\n\
                      # rename = \"...\" to choose its name, exported = true to export it.\n\n";
        fs::write(&self.path, format!("{}{}", header, content))
            .map_err(|e| CoreError::io(&self.path, e))?;
        info!("wrote {} binding entries to {}", list.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(entries: &[(&str, &str)]) -> BTreeMap<BindingKey, String> {
        entries
            .iter()
            .map(|(k, d)| (BindingKey::new(*k), d.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_for_unknown_keys() {
        let list = BindingList::new();
        let key = BindingKey::new("fmt.Println");
        assert!(list.is_enabled(&key));
        assert!(!list.is_exported(&key));
        assert_eq!(list.rename(&key), None);
    }

    #[test]
    fn test_reconcile_preserves_user_fields() {
        let mut list = BindingList::new();
        list.bindings.insert(
            BindingKey::new("fmt.Println"),
            PersistedOverride {
                enabled: false,
                rename: Some("say".to_string()),
                exported: true,
                doc: "old".to_string(),
            },
        );
        list.bindings
            .insert(BindingKey::new("fmt.Gone"), PersistedOverride::default());

        let summary = list.reconcile(&docs(&[("fmt.Println", "new"), ("fmt.Sprint", "s")]));

        assert_eq!(
            summary,
            ReconcileSummary {
                added: 1,
                removed: 1,
                changed_docs: 1
            }
        );
        let println = list.get(&BindingKey::new("fmt.Println")).unwrap();
        assert!(!println.enabled);
        assert_eq!(println.rename.as_deref(), Some("say"));
        assert!(println.exported);
        assert_eq!(println.doc, "new");
        assert!(list.get(&BindingKey::new("fmt.Gone")).is_none());
        assert!(list.is_enabled(&BindingKey::new("fmt.Sprint")));
    }

    #[test]
    fn test_reconcile_keeps_customized_missing_entries() {
        let mut list = BindingList::new();
        let custom = PersistedOverride {
            enabled: false,
            rename: Some("go".to_string()),
            exported: true,
            doc: "Run runs.".to_string(),
        };
        list.bindings
            .insert(BindingKey::new("example.com/app.Run"), custom.clone());
        list.bindings
            .insert(BindingKey::new("example.com/app.Stop"), PersistedOverride::default());

        let summary = list.reconcile(&docs(&[]));

        assert_eq!(summary.removed, 1);
        assert_eq!(list.get(&BindingKey::new("example.com/app.Run")), Some(&custom));
        assert!(list.get(&BindingKey::new("example.com/app.Stop")).is_none());
    }

    #[test]
    fn test_customized_fields() {
        assert!(!PersistedOverride::default().is_customized());
        let renamed = PersistedOverride {
            rename: Some("x".to_string()),
            ..PersistedOverride::default()
        };
        assert!(renamed.is_customized());
        let disabled = PersistedOverride {
            enabled: false,
            ..PersistedOverride::default()
        };
        assert!(disabled.is_customized());
    }

    #[test]
    fn test_toml_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlBindingStore::new(dir.path().join("bindings.toml"));
        assert!(store.load().unwrap().is_empty());

        let mut list = BindingList::new();
        list.reconcile(&docs(&[("bytes.*Buffer//Write", "Write appends")]));
        list.bindings
            .get_mut(&BindingKey::new("bytes.*Buffer//Write"))
            .unwrap()
            .rename = Some("buffer-write".to_string());
        store.save(&list).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, list);
        assert_eq!(
            loaded.rename(&BindingKey::new("bytes.*Buffer//Write")),
            Some("buffer-write")
        );
    }

    #[test]
    fn test_hand_edited_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.toml");
        fs::write(
            &path,
            r#"
[bindings."fmt.Println"]
enabled = false

[bindings."fmt.Sprint"]
exported = true
"#,
        )
        .unwrap();
        let list = TomlBindingStore::new(&path).load().unwrap();
        assert!(!list.is_enabled(&BindingKey::new("fmt.Println")));
        assert!(list.is_enabled(&BindingKey::new("fmt.Sprint")));
        assert!(list.is_exported(&BindingKey::new("fmt.Sprint")));
    }
}
