//! Driver-abstraction boundary for seeding.
//!
//! The seeder only needs a handful of operations from the backing store. The
//! `SeedTarget` trait captures them so that duplicate-key handling is decided
//! on a named [`WriteFailure`] classification rather than on the storage
//! engine's numeric error codes.

use crate::error::SeedError;
use async_trait::async_trait;
use bson::Document;
use thiserror::Error;

/// Boxed error type for target operations other than document writes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server error codes that signal a unique-index conflict.
///
/// 11000 is the canonical code; 11001 and 12582 are legacy variants still
/// reported by some server versions.
pub const DUPLICATE_KEY_CODES: [i32; 3] = [11000, 11001, 12582];

/// Classified failure of a single document write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteFailure {
    /// A unique constraint already holds this document's key.
    #[error("duplicate key: {message}")]
    DuplicateKey { message: String },

    /// Any other write failure.
    #[error("{message}{}", code_suffix(.code))]
    Other { code: Option<i32>, message: String },
}

fn code_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (code {c})")).unwrap_or_default()
}

impl WriteFailure {
    /// Classify a server error code.
    pub fn from_code(code: Option<i32>, message: impl Into<String>) -> Self {
        match code {
            Some(c) if DUPLICATE_KEY_CODES.contains(&c) => WriteFailure::DuplicateKey {
                message: message.into(),
            },
            _ => WriteFailure::Other {
                code,
                message: message.into(),
            },
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, WriteFailure::DuplicateKey { .. })
    }
}

/// Operations the seeder performs against one database.
///
/// Implementations must allow concurrent calls from a single shared
/// reference; the seeder inserts documents and provisions distinct
/// collections in parallel.
#[async_trait]
pub trait SeedTarget: Send + Sync {
    /// Names of the collections that currently exist.
    async fn list_collection_names(&self) -> Result<Vec<String>, BoxError>;

    /// Drop a collection together with its documents and indexes.
    async fn drop_collection(&self, collection: &str) -> Result<(), BoxError>;

    /// Create an empty collection with default indexes only.
    async fn create_collection(&self, collection: &str) -> Result<(), BoxError>;

    /// Insert one document, acknowledged by the primary.
    async fn insert_document(&self, collection: &str, document: Document)
        -> Result<(), WriteFailure>;

    /// Drop the whole database.
    async fn drop_database(&self) -> Result<(), BoxError>;

    /// Release the connection. Called once after every seed operation.
    async fn shutdown(&self) {}
}

/// Opens a fresh [`SeedTarget`] for each seed operation.
#[async_trait]
pub trait Connector: Send + Sync {
    type Target: SeedTarget;

    /// Establish a database handle, failing with [`SeedError::Connection`].
    async fn connect(&self) -> Result<Self::Target, SeedError>;

    /// Name of the database the targets point at, for logs and errors.
    fn database_name(&self) -> &str;
}
