//! Error types for seed source resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning seed input into collection tasks.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Missing or unusable caller-supplied arguments.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A directory scan found an entry that is not a `.json` file.
    #[error("Format error: '{}' is not a .json file", path.display())]
    Format { path: PathBuf },

    /// A seed file is missing, unreadable or empty.
    #[error("File error: '{}': {message}", path.display())]
    File { path: PathBuf, message: String },

    /// Seed content is not valid JSON, or not a list of documents.
    #[error("Parse error in {origin}: {message}")]
    Parse { origin: String, message: String },
}

impl SourceError {
    pub(crate) fn file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SourceError::File {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn parse(origin: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::Parse {
            origin: origin.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
