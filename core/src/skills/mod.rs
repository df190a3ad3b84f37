pub mod installer;
pub mod manifest;
pub mod registry;
pub mod skill;

pub use installer::{InstallReport, SkillInstaller, UninstallReport};
pub use manifest::{ManifestEntry, RecordedEntry, SkillsManifest};
pub use registry::{InstalledSkill, SkillRegistry, SkillState};
pub use skill::{SkillDocument, read_skill_document};
