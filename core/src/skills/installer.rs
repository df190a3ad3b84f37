//! Install and uninstall a packaged skill into a scope.
//!
//! Each operation is a straight line of filesystem steps. A failing step
//! stops the sequence; nothing already done is rolled back, and every step
//! is safe to re-run.

use std::path::{Path, PathBuf};

use crate::config::{ASSET_FILE, Scope, SkillDescriptor, SkillPackage, SkillRoots};
use crate::error::{Result, SkillError};

use super::manifest::{ManifestEntry, SkillsManifest};
use super::skill::parse_skill_md;

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UninstallReport {
    pub name: String,
}

pub struct SkillInstaller {
    roots: SkillRoots,
    scope: Scope,
}

impl SkillInstaller {
    pub fn new(roots: SkillRoots, scope: Scope) -> Self {
        Self { roots, scope }
    }

    pub fn install(&self, package: &SkillPackage) -> Result<InstallReport> {
        let name = package.name();
        let skill_path = self.roots.skill_dir(self.scope, name);
        let manifest_path = self.roots.manifest_path(self.scope);

        std::fs::create_dir_all(&skill_path)
            .map_err(|e| SkillError::fs("Failed to create", &skill_path, e))?;

        let dest = skill_path.join(ASSET_FILE);
        std::fs::copy(&package.asset, &dest)
            .map_err(|e| SkillError::fs("Failed to copy", &package.asset, e))?;
        tracing::debug!(from = %package.asset.display(), to = %dest.display(), "Copied skill asset");

        check_document_name(name, &dest);

        let mut manifest = SkillsManifest::load(&manifest_path)?;
        let previous = manifest.upsert(
            name,
            ManifestEntry::new(&package.descriptor.package, &package.metadata.version),
        );
        manifest.save(&manifest_path)?;

        tracing::info!(
            skill = %name,
            version = %package.metadata.version,
            scope = %self.scope,
            path = %skill_path.display(),
            replaced = previous.is_some(),
            "Skill installed"
        );

        Ok(InstallReport {
            name: name.to_string(),
            version: package.metadata.version.clone(),
            path: skill_path,
        })
    }

    pub fn uninstall(&self, descriptor: &SkillDescriptor) -> Result<UninstallReport> {
        let name = descriptor.name.as_str();
        let skill_path = self.roots.skill_dir(self.scope, name);
        let manifest_path = self.roots.manifest_path(self.scope);

        let removed_dir = remove_path(&skill_path)?;

        let mut removed_entry = false;
        if manifest_path.exists() {
            let mut manifest = SkillsManifest::load_existing(&manifest_path)?;
            removed_entry = manifest.remove(name).is_some();
            manifest.save(&manifest_path)?;
        }

        if !removed_dir && !removed_entry {
            tracing::debug!(skill = %name, scope = %self.scope, "Skill was not installed");
        }

        tracing::info!(skill = %name, scope = %self.scope, removed_dir, removed_entry, "Skill uninstalled");

        Ok(UninstallReport {
            name: name.to_string(),
        })
    }
}

/// Removes a directory tree, or a lone file or symlink sitting in its place.
/// Returns whether anything was there.
fn remove_path(path: &Path) -> Result<bool> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(SkillError::fs("Failed to inspect", path, e)),
    };

    let removed = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match removed {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(SkillError::fs("Failed to remove", path, e)),
    }
}

fn check_document_name(name: &str, path: &Path) {
    match parse_skill_md(path) {
        Ok(doc) if doc.has_front_matter && doc.name != name => {
            tracing::warn!(
                skill = %name,
                declared = %doc.name,
                "SKILL.md front matter name differs from descriptor"
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(skill = %name, "Could not read installed SKILL.md: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PackageMetadata, load_descriptor};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        roots: SkillRoots,
        packages: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let home = tmp.path().join("home");
            let cwd = tmp.path().join("project");
            let packages = tmp.path().join("packages");
            for dir in [&home, &cwd, &packages] {
                std::fs::create_dir_all(dir).unwrap();
            }
            Self {
                roots: SkillRoots::new(home, cwd),
                packages,
                _tmp: tmp,
            }
        }

        fn package(&self, name: &str, package: &str, version: &str) -> SkillPackage {
            let dir = self.packages.join(name);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(
                dir.join(".claude-skill.json"),
                format!(r#"{{"name":"{name}","package":"{package}"}}"#),
            )
            .unwrap();
            std::fs::write(
                dir.join("package.json"),
                format!(r#"{{"name":"{package}","version":"{version}"}}"#),
            )
            .unwrap();
            std::fs::write(
                dir.join("SKILL.md"),
                format!("---\nname: {name}\ndescription: The {name} skill\n---\n# {name}\n"),
            )
            .unwrap();
            SkillPackage::load(&dir).unwrap()
        }

        fn installer(&self, scope: Scope) -> SkillInstaller {
            SkillInstaller::new(self.roots.clone(), scope)
        }

        fn manifest_json(&self, scope: Scope) -> serde_json::Value {
            let raw = std::fs::read_to_string(self.roots.manifest_path(scope)).unwrap();
            serde_json::from_str(&raw).unwrap()
        }
    }

    #[test]
    fn install_then_uninstall_local_foo() {
        let fx = Fixture::new();
        let pkg = fx.package("foo", "@x/foo", "1.2.0");
        let installer = fx.installer(Scope::Local);

        let report = installer.install(&pkg).unwrap();
        assert_eq!(report.name, "foo");
        assert_eq!(report.version, "1.2.0");
        assert_eq!(report.path, fx.roots.cwd.join(".claude/skills/foo"));
        assert!(fx.roots.cwd.join(".claude/skills/foo/SKILL.md").is_file());

        let manifest = fx.manifest_json(Scope::Local);
        assert_eq!(manifest["foo"]["package"], "@x/foo");
        assert_eq!(manifest["foo"]["version"], "1.2.0");
        assert!(manifest["foo"]["installed"].is_string());

        let report = installer.uninstall(&pkg.descriptor).unwrap();
        assert_eq!(report.name, "foo");
        assert!(!fx.roots.cwd.join(".claude/skills/foo").exists());
        assert_eq!(
            std::fs::read_to_string(fx.roots.manifest_path(Scope::Local)).unwrap(),
            "{}"
        );
    }

    #[test]
    fn double_install_keeps_one_entry_with_fresh_timestamp() {
        let fx = Fixture::new();
        let pkg = fx.package("foo", "@x/foo", "1.2.0");
        let installer = fx.installer(Scope::Local);

        installer.install(&pkg).unwrap();
        let first = fx.manifest_json(Scope::Local)["foo"]["installed"]
            .as_str()
            .unwrap()
            .to_string();

        std::thread::sleep(std::time::Duration::from_millis(5));
        installer.install(&pkg).unwrap();

        let manifest = fx.manifest_json(Scope::Local);
        let entries = manifest.as_object().unwrap();
        assert_eq!(entries.len(), 1);
        let second = entries["foo"]["installed"].as_str().unwrap();

        let first = chrono::DateTime::parse_from_rfc3339(&first).unwrap();
        let second = chrono::DateTime::parse_from_rfc3339(second).unwrap();
        assert!(second > first);
    }

    #[test]
    fn install_overwrites_existing_asset() {
        let fx = Fixture::new();
        let pkg = fx.package("foo", "@x/foo", "1.2.0");
        let dest = fx.roots.skill_dir(Scope::Local, "foo").join("SKILL.md");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, "stale").unwrap();

        fx.installer(Scope::Local).install(&pkg).unwrap();
        assert_ne!(std::fs::read_to_string(&dest).unwrap(), "stale");
    }

    #[test]
    fn unrelated_entries_survive() {
        let fx = Fixture::new();
        let foo = fx.package("foo", "@x/foo", "1.2.0");
        let bar = fx.package("bar", "@x/bar", "0.3.1");
        let installer = fx.installer(Scope::Local);

        installer.install(&foo).unwrap();
        installer.install(&bar).unwrap();
        let bar_entry = fx.manifest_json(Scope::Local)["bar"].clone();

        installer.install(&foo).unwrap();
        installer.uninstall(&foo.descriptor).unwrap();

        let manifest = fx.manifest_json(Scope::Local);
        let entries = manifest.as_object().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["bar"], bar_entry);
        assert!(fx.roots.skill_dir(Scope::Local, "bar").join("SKILL.md").exists());
    }

    #[test]
    fn uninstall_never_installed_creates_nothing() {
        let fx = Fixture::new();
        let descriptor = SkillDescriptor {
            name: "ghost".to_string(),
            package: "@x/ghost".to_string(),
        };

        fx.installer(Scope::Local).uninstall(&descriptor).unwrap();
        assert!(!fx.roots.manifest_path(Scope::Local).exists());
        assert!(!fx.roots.base_dir(Scope::Local).exists());
    }

    #[test]
    fn uninstall_never_installed_keeps_manifest_entries() {
        let fx = Fixture::new();
        let foo = fx.package("foo", "@x/foo", "1.2.0");
        let installer = fx.installer(Scope::Local);
        installer.install(&foo).unwrap();
        let before = fx.manifest_json(Scope::Local);

        let ghost = SkillDescriptor {
            name: "ghost".to_string(),
            package: "@x/ghost".to_string(),
        };
        installer.uninstall(&ghost).unwrap();

        assert_eq!(fx.manifest_json(Scope::Local), before);
    }

    #[test]
    fn scopes_are_isolated() {
        let fx = Fixture::new();
        let foo = fx.package("foo", "@x/foo", "1.2.0");
        let bar = fx.package("bar", "@x/bar", "2.0.0");

        fx.installer(Scope::Global).install(&foo).unwrap();
        assert!(!fx.roots.base_dir(Scope::Local).exists());

        fx.installer(Scope::Local).install(&bar).unwrap();
        let global = fx.manifest_json(Scope::Global);
        let local = fx.manifest_json(Scope::Local);
        assert!(global.get("bar").is_none());
        assert!(local.get("foo").is_none());

        fx.installer(Scope::Local).uninstall(&foo.descriptor).unwrap();
        assert!(fx.roots.skill_dir(Scope::Global, "foo").exists());
        assert!(fx.manifest_json(Scope::Global).get("foo").is_some());
    }

    #[test]
    fn missing_asset_fails_after_creating_dir() {
        let fx = Fixture::new();
        let pkg = fx.package("foo", "@x/foo", "1.2.0");
        std::fs::remove_file(&pkg.asset).unwrap();

        let err = fx.installer(Scope::Local).install(&pkg).unwrap_err();
        assert!(matches!(err, SkillError::Fs { .. }));
        assert!(fx.roots.skill_dir(Scope::Local, "foo").is_dir());
        assert!(!fx.roots.manifest_path(Scope::Local).exists());
    }

    #[test]
    fn malformed_manifest_aborts_install_but_keeps_files() {
        let fx = Fixture::new();
        let pkg = fx.package("foo", "@x/foo", "1.2.0");
        let manifest_path = fx.roots.manifest_path(Scope::Local);
        std::fs::create_dir_all(manifest_path.parent().unwrap()).unwrap();
        std::fs::write(&manifest_path, "not json").unwrap();

        let err = fx.installer(Scope::Local).install(&pkg).unwrap_err();
        assert!(matches!(err, SkillError::Manifest { .. }));
        assert!(fx.roots.skill_dir(Scope::Local, "foo").join("SKILL.md").exists());
        assert_eq!(std::fs::read_to_string(&manifest_path).unwrap(), "not json");
    }

    #[test]
    fn malformed_manifest_fails_uninstall_after_dir_removed() {
        let fx = Fixture::new();
        let pkg = fx.package("foo", "@x/foo", "1.2.0");
        let installer = fx.installer(Scope::Local);
        installer.install(&pkg).unwrap();
        std::fs::write(fx.roots.manifest_path(Scope::Local), "{").unwrap();

        let err = installer.uninstall(&pkg.descriptor).unwrap_err();
        assert!(matches!(err, SkillError::Manifest { .. }));
        assert!(!fx.roots.skill_dir(Scope::Local, "foo").exists());
    }

    #[test]
    fn uninstall_only_needs_descriptor() {
        let fx = Fixture::new();
        let pkg = fx.package("foo", "@x/foo", "1.2.0");
        let installer = fx.installer(Scope::Local);
        installer.install(&pkg).unwrap();

        let dir = fx.packages.join("foo");
        std::fs::remove_file(dir.join("package.json")).unwrap();
        let descriptor = load_descriptor(&dir).unwrap();
        installer.uninstall(&descriptor).unwrap();
        assert!(fx.manifest_json(Scope::Local).get("foo").is_none());
    }

    #[test]
    fn uninstall_removes_plain_file_in_place_of_dir() {
        let fx = Fixture::new();
        let skill_path = fx.roots.skill_dir(Scope::Local, "foo");
        std::fs::create_dir_all(skill_path.parent().unwrap()).unwrap();
        std::fs::write(&skill_path, "not a directory").unwrap();

        let descriptor = SkillDescriptor {
            name: "foo".to_string(),
            package: "@x/foo".to_string(),
        };
        fx.installer(Scope::Local).uninstall(&descriptor).unwrap();
        assert!(std::fs::symlink_metadata(&skill_path).is_err());
    }

    #[test]
    fn install_and_uninstall_keep_loosely_shaped_neighbour() {
        let fx = Fixture::new();
        let pkg = fx.package("foo", "@x/foo", "1.2.0");
        let manifest_path = fx.roots.manifest_path(Scope::Local);
        std::fs::create_dir_all(manifest_path.parent().unwrap()).unwrap();
        let neighbour = serde_json::json!({"package": "@x/bar", "version": "0.1.0"});
        std::fs::write(
            &manifest_path,
            serde_json::json!({ "bar": neighbour }).to_string(),
        )
        .unwrap();

        let installer = fx.installer(Scope::Local);
        installer.install(&pkg).unwrap();
        let manifest = fx.manifest_json(Scope::Local);
        assert_eq!(manifest["bar"], neighbour);
        assert_eq!(manifest["foo"]["version"], "1.2.0");

        installer.uninstall(&pkg.descriptor).unwrap();
        let manifest = fx.manifest_json(Scope::Local);
        assert_eq!(manifest, serde_json::json!({ "bar": neighbour }));
    }

    #[test]
    fn mismatched_front_matter_does_not_fail() {
        let fx = Fixture::new();
        let asset = fx.packages.join("odd.md");
        std::fs::write(&asset, "---\nname: other\n---\n").unwrap();
        let pkg = SkillPackage {
            descriptor: SkillDescriptor {
                name: "odd".to_string(),
                package: "@x/odd".to_string(),
            },
            metadata: PackageMetadata {
                version: "0.0.1".to_string(),
            },
            asset,
        };

        let report = fx.installer(Scope::Local).install(&pkg).unwrap();
        assert!(report.path.join("SKILL.md").exists());
    }
}
