use crate::error::{Result, SkillError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DESCRIPTOR_FILE: &str = ".claude-skill.json";
pub const PACKAGE_FILE: &str = "package.json";
pub const ASSET_FILE: &str = "SKILL.md";
pub const MANIFEST_FILE: &str = ".skills-manifest.json";
pub const GLOBAL_FLAG_ENV: &str = "npm_config_global";

const CLAUDE_DIR: &str = ".claude";
const SKILLS_DIR: &str = "skills";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SkillDescriptor {
    pub name: String,
    pub package: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PackageMetadata {
    pub version: String,
}

/// Everything an install needs from the shipped package directory.
#[derive(Debug, Clone)]
pub struct SkillPackage {
    pub descriptor: SkillDescriptor,
    pub metadata: PackageMetadata,
    pub asset: PathBuf,
}

impl SkillPackage {
    pub fn load(package_dir: &Path) -> Result<Self> {
        let descriptor: SkillDescriptor = read_json(&package_dir.join(DESCRIPTOR_FILE))?;
        validate_skill_name(&descriptor.name)?;
        let metadata: PackageMetadata = read_json(&package_dir.join(PACKAGE_FILE))?;

        tracing::debug!(
            name = %descriptor.name,
            package = %descriptor.package,
            version = %metadata.version,
            "Loaded skill package"
        );

        Ok(Self {
            descriptor,
            metadata,
            asset: package_dir.join(ASSET_FILE),
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// Uninstall only needs the descriptor; a missing package.json must not block it.
pub fn load_descriptor(package_dir: &Path) -> Result<SkillDescriptor> {
    let descriptor: SkillDescriptor = read_json(&package_dir.join(DESCRIPTOR_FILE))?;
    validate_skill_name(&descriptor.name)?;
    Ok(descriptor)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SkillError::config(format!("{} not found", path.display()))
        } else {
            SkillError::config(format!("Failed to read {}: {}", path.display(), e))
        }
    })?;

    serde_json::from_str(&content)
        .map_err(|e| SkillError::config(format!("Failed to parse {}: {}", path.display(), e)))
}

pub fn validate_skill_name(name: &str) -> Result<()> {
    if is_unsafe_skill_name(name) {
        return Err(SkillError::config(format!("Invalid skill name: {:?}", name)));
    }
    Ok(())
}

pub(crate) fn is_unsafe_skill_name(name: &str) -> bool {
    name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.trim().is_empty()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Local,
}

impl Scope {
    /// Only the exact string `"true"` selects the global scope.
    pub fn from_global_flag(value: Option<&str>) -> Self {
        match value {
            Some("true") => Scope::Global,
            _ => Scope::Local,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Anchor directories the two scopes hang off.
#[derive(Debug, Clone)]
pub struct SkillRoots {
    pub home: PathBuf,
    pub cwd: PathBuf,
}

impl SkillRoots {
    pub fn new(home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            cwd: cwd.into(),
        }
    }

    pub fn detect() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| SkillError::config("Could not determine home directory"))?;
        let cwd = std::env::current_dir()
            .map_err(|e| SkillError::fs("Failed to read current directory", ".", e))?;
        Ok(Self { home, cwd })
    }

    pub fn base_dir(&self, scope: Scope) -> PathBuf {
        let root = match scope {
            Scope::Global => &self.home,
            Scope::Local => &self.cwd,
        };
        root.join(CLAUDE_DIR).join(SKILLS_DIR)
    }

    pub fn skill_dir(&self, scope: Scope, name: &str) -> PathBuf {
        self.base_dir(scope).join(name)
    }

    pub fn manifest_path(&self, scope: Scope) -> PathBuf {
        self.base_dir(scope).join(MANIFEST_FILE)
    }
}
