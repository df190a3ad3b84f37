use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SkillError>;

#[derive(Error, Debug)]
pub enum SkillError {
    /// Descriptor or package metadata could not be loaded, or describes
    /// something we refuse to act on.
    #[error("{0}")]
    Config(String),

    #[error("{action} {}: {source}", path.display())]
    Fs {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },
}

impl SkillError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn fs(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Fs {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Manifest {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
