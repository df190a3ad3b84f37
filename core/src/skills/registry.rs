use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Scope, SkillRoots, is_unsafe_skill_name};
use crate::error::{Result, SkillError};

use super::manifest::{RecordedEntry, SkillsManifest};
use super::skill::{SkillDocument, read_skill_document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillState {
    Installed,
    /// Directory present, no manifest entry.
    Unregistered,
    /// Manifest entry present, directory gone.
    MissingFiles,
}

#[derive(Debug, Clone)]
pub struct InstalledSkill {
    pub name: String,
    pub state: SkillState,
    pub entry: Option<RecordedEntry>,
    pub document: Option<SkillDocument>,
}

/// A read-only view of one scope, merging the manifest with what is on disk.
#[derive(Debug, Clone)]
pub struct SkillRegistry {
    base_dir: PathBuf,
    skills: BTreeMap<String, InstalledSkill>,
}

impl SkillRegistry {
    pub fn load(roots: &SkillRoots, scope: Scope) -> Result<Self> {
        let base_dir = roots.base_dir(scope);
        let manifest = SkillsManifest::load(&roots.manifest_path(scope))?;
        let mut registry = Self {
            base_dir,
            skills: BTreeMap::new(),
        };

        let dirs = registry.scan_dirs()?;

        for (name, entry) in manifest.iter() {
            let on_disk = dirs.contains_key(name);
            registry.skills.insert(
                name.clone(),
                InstalledSkill {
                    name: name.clone(),
                    state: if on_disk {
                        SkillState::Installed
                    } else {
                        SkillState::MissingFiles
                    },
                    entry: Some(entry),
                    document: None,
                },
            );
        }

        for (name, path) in dirs {
            let document = match read_skill_document(&path) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    tracing::warn!("Failed to read skill '{}': {}", name, e);
                    None
                }
            };

            match registry.skills.get_mut(&name) {
                Some(skill) => skill.document = document,
                None => {
                    registry.skills.insert(
                        name.clone(),
                        InstalledSkill {
                            name,
                            state: SkillState::Unregistered,
                            entry: None,
                            document,
                        },
                    );
                }
            }
        }

        tracing::debug!(
            count = registry.skills.len(),
            path = %registry.base_dir.display(),
            "Skills listed"
        );

        Ok(registry)
    }

    fn scan_dirs(&self) -> Result<BTreeMap<String, PathBuf>> {
        let mut found = BTreeMap::new();

        if !self.base_dir.exists() {
            tracing::debug!("Skills directory does not exist: {}", self.base_dir.display());
            return Ok(found);
        }

        let entries = fs::read_dir(&self.base_dir)
            .map_err(|e| SkillError::fs("Failed to read", &self.base_dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| SkillError::fs("Failed to read", &self.base_dir, e))?;
            let path = entry.path();

            if !path.is_dir() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if name.starts_with('.') {
                continue;
            }

            if is_unsafe_skill_name(name) {
                tracing::warn!("Skipping unsafe skill name: {}", name);
                continue;
            }

            found.insert(name.to_string(), path);
        }

        Ok(found)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn exists(&self) -> bool {
        self.base_dir.exists()
    }

    pub fn list(&self) -> impl Iterator<Item = &InstalledSkill> {
        self.skills.values()
    }

    pub fn count(&self) -> usize {
        self.skills.len()
    }
}
