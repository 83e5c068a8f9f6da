//! Seed source resolution for mongo-seed.
//!
//! Seed input arrives in one of three shapes:
//!
//! - **In-memory records**: a list of JSON objects plus a caller-supplied
//!   collection name
//! - **Single file**: a JSON file holding an array of objects (or one object)
//! - **Directory**: a directory whose immediate entries are all `.json` files,
//!   one collection per file
//!
//! [`resolve`] classifies the input and normalizes it into a list of
//! [`CollectionTask`]s, each pairing a collection name with BSON documents
//! ready for insertion.
//!
//! # Example
//!
//! ```ignore
//! use mongo_seed_source::{resolve, SeedData};
//! use extjson_types::NormalizeOptions;
//!
//! let tasks = resolve(SeedData::from("./seeds"), None, &NormalizeOptions::default()).await?;
//! for task in &tasks {
//!     println!("{} -> {} documents", task.collection_name, task.documents.len());
//! }
//! ```

mod error;
mod parse;
mod resolve;

use bson::Document;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

pub use error::{Result, SourceError};
pub use extjson_types::NormalizeOptions;
pub use parse::{collection_name_for, parse_documents, records_to_documents};
pub use resolve::{classify, list_json_files, resolve};

/// Raw seed input as handed to the seeder.
#[derive(Debug, Clone)]
pub enum SeedData {
    /// Records already in memory
    Records(Vec<Value>),
    /// A file or directory on the local filesystem
    Path(PathBuf),
}

impl From<Vec<Value>> for SeedData {
    fn from(records: Vec<Value>) -> Self {
        SeedData::Records(records)
    }
}

impl From<PathBuf> for SeedData {
    fn from(path: PathBuf) -> Self {
        SeedData::Path(path)
    }
}

impl From<&Path> for SeedData {
    fn from(path: &Path) -> Self {
        SeedData::Path(path.to_path_buf())
    }
}

impl From<&str> for SeedData {
    fn from(path: &str) -> Self {
        SeedData::Path(PathBuf::from(path))
    }
}

impl From<String> for SeedData {
    fn from(path: String) -> Self {
        SeedData::Path(PathBuf::from(path))
    }
}

/// Seed input after classification.
#[derive(Debug, Clone)]
pub enum SeedSource {
    InMemory {
        records: Vec<Value>,
        collection_name: String,
    },
    SingleFile(PathBuf),
    Directory(PathBuf),
}

/// Where a task's documents came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOrigin {
    InMemory,
    File(PathBuf),
}

impl fmt::Display for TaskOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOrigin::InMemory => write!(f, "in-memory records"),
            TaskOrigin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One unit of seeding work: a destination collection and its documents.
#[derive(Debug, Clone)]
pub struct CollectionTask {
    pub collection_name: String,
    pub documents: Vec<Document>,
    pub origin: TaskOrigin,
}

impl CollectionTask {
    pub fn new(
        collection_name: impl Into<String>,
        documents: Vec<Document>,
        origin: TaskOrigin,
    ) -> Self {
        Self {
            collection_name: collection_name.into(),
            documents,
            origin,
        }
    }
}
