use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::config::ASSET_FILE;

#[derive(Debug, Deserialize)]
struct FrontMatter {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// What a `SKILL.md` says about itself.
#[derive(Debug, Clone)]
pub struct SkillDocument {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub has_front_matter: bool,
}

pub fn read_skill_document(skill_dir: &Path) -> Result<SkillDocument> {
    let md_path = skill_dir.join(ASSET_FILE);

    if !md_path.exists() {
        anyhow::bail!("No {} found in {}", ASSET_FILE, skill_dir.display());
    }
    parse_skill_md(&md_path)
}

pub fn parse_skill_md(path: &Path) -> Result<SkillDocument> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    if let Some((yaml, _body)) = split_front_matter(&content) {
        match serde_yaml::from_str::<FrontMatter>(yaml) {
            Ok(fm) => {
                return Ok(SkillDocument {
                    name: fm.name,
                    description: fm.description,
                    version: fm.version,
                    author: fm.author,
                    tags: fm.tags,
                    has_front_matter: true,
                });
            }
            Err(e) => {
                tracing::debug!("Ignoring front matter in {}: {}", path.display(), e);
            }
        }
    }

    let mut lines = content.lines().map(str::trim);
    let heading = lines
        .clone()
        .find(|l| l.starts_with('#'))
        .map(|l| l.trim_start_matches('#').trim())
        .unwrap_or_default();
    let description = lines
        .find(|l| !(l.is_empty() || l.starts_with('#') || *l == "---"))
        .map(str::to_string);

    Ok(SkillDocument {
        name: if heading.is_empty() {
            "unnamed".to_string()
        } else {
            heading.to_string()
        },
        description,
        version: None,
        author: None,
        tags: vec![],
        has_front_matter: false,
    })
}

/// Splits `---`-fenced YAML off the top of a document.
fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}
