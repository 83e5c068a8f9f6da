//! Error types for seeding.

use crate::target::{BoxError, WriteFailure};
use mongo_seed_source::SourceError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during a seed operation.
///
/// Duplicate-key conflicts never show up here: the bulk inserter counts them
/// as skips.
#[derive(Error, Debug)]
pub enum SeedError {
    /// Invalid construction or call arguments. No connection is attempted.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The database could not be reached or rejected the credentials.
    #[error("Connection error for {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: BoxError,
    },

    /// A directory scan found a non-`.json` entry.
    #[error("Format error: '{}' is not a .json file", path.display())]
    Format { path: PathBuf },

    /// A seed file is missing, unreadable or empty.
    #[error("File error: '{}': {message}", path.display())]
    File { path: PathBuf, message: String },

    /// Seed content is not valid JSON or not a list of documents.
    #[error("Parse error in {origin}: {message}")]
    Parse { origin: String, message: String },

    /// Listing, dropping or recreating a collection failed.
    #[error("Failed to provision collection '{collection}': {source}")]
    Provision {
        collection: String,
        #[source]
        source: BoxError,
    },

    /// A document insert failed for a reason other than a duplicate key.
    #[error("Failed to insert into collection '{collection}': {failure}")]
    Insert {
        collection: String,
        failure: WriteFailure,
    },

    /// Dropping the whole database failed.
    #[error("Failed to drop database '{database}': {source}")]
    DropDatabase {
        database: String,
        #[source]
        source: BoxError,
    },
}

impl From<SourceError> for SeedError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Config(message) => SeedError::Config(message),
            SourceError::Format { path } => SeedError::Format { path },
            SourceError::File { path, message } => SeedError::File { path, message },
            SourceError::Parse { origin, message } => SeedError::Parse { origin, message },
        }
    }
}

pub type Result<T> = std::result::Result<T, SeedError>;
