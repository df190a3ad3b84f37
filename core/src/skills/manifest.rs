//! The per-scope `.skills-manifest.json` registry.
//!
//! A JSON object keyed by skill name. Only the top level has to be an
//! object; entries written by other tools keep whatever shape they have.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SkillError};

/// The record written for a skill on install.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    pub package: String,
    pub version: String,
    /// ISO-8601 UTC, millisecond precision.
    pub installed: String,
}

impl ManifestEntry {
    pub fn new(package: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
            installed: now_timestamp(),
        }
    }
}

/// Best-effort reading of an existing entry, whatever its shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedEntry {
    pub package: Option<String>,
    pub version: Option<String>,
    pub installed: Option<String>,
}

impl RecordedEntry {
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| match value.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        Self {
            package: field("package"),
            version: field("version"),
            installed: field("installed"),
        }
    }

    fn from_stored(stored: &StoredEntry) -> Self {
        match stored {
            StoredEntry::Written(entry) => Self {
                package: Some(entry.package.clone()),
                version: Some(entry.version.clone()),
                installed: Some(entry.installed.clone()),
            },
            StoredEntry::Foreign(value) => Self::from_value(value),
        }
    }
}

/// Entries in our own shape serialize in field order; anything else is
/// carried through as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
enum StoredEntry {
    Written(ManifestEntry),
    Foreign(Value),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SkillsManifest {
    entries: BTreeMap<String, StoredEntry>,
}

impl SkillsManifest {
    /// Empty when the file doesn't exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_existing(path)
    }

    pub fn load_existing(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SkillError::manifest(path, e))?;
        serde_json::from_str(&content).map_err(|e| SkillError::manifest(path, e))
    }

    /// Pretty-printed with two-space indentation, replacing the whole file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| SkillError::manifest(path, e))?;
        std::fs::write(path, content).map_err(|e| SkillError::manifest(path, e))?;
        tracing::debug!(path = %path.display(), entries = self.len(), "Manifest saved");
        Ok(())
    }

    /// Replaces any previous entry for `name` wholesale.
    pub fn upsert(&mut self, name: impl Into<String>, entry: ManifestEntry) -> Option<RecordedEntry> {
        self.entries
            .insert(name.into(), StoredEntry::Written(entry))
            .map(|previous| RecordedEntry::from_stored(&previous))
    }

    pub fn remove(&mut self, name: &str) -> Option<RecordedEntry> {
        self.entries
            .remove(name)
            .map(|previous| RecordedEntry::from_stored(&previous))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, RecordedEntry)> {
        self.entries
            .iter()
            .map(|(name, stored)| (name, RecordedEntry::from_stored(stored)))
    }
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
