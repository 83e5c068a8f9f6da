//! MongoSeed Library
//!
//! Populate MongoDB collections from JSON seed data.
//!
//! # Features
//!
//! - Seed sources: in-memory records, a single JSON file, or a directory of
//!   JSON files (one collection per file, named after the file)
//! - Extended JSON: `{"$oid": ...}`, `{"$date": ...}` and friends are stored
//!   as native BSON types
//! - Overwrite mode: drop and recreate each collection before inserting
//! - Idempotent re-runs: duplicate-key conflicts are counted and skipped
//!
//! # Usage
//!
//! ```ignore
//! use mongo_seed::{SeedOpts, Seeder};
//!
//! let seeder = Seeder::new(SeedOpts::new("localhost", "cit_test"))?;
//!
//! // One collection per file in ./json
//! let report = seeder.seed("./json", None).await?;
//!
//! // In-memory records need a collection name
//! let records = vec![serde_json::json!({"_id": 1, "name": "Ada"})];
//! seeder.seed(records, Some("crews")).await?;
//! ```

pub mod config;
pub mod connect;
pub mod error;
pub mod insert;
pub mod mongodb;
pub mod provision;
pub mod seeder;
pub mod target;
pub mod testing;

pub use config::SeedOpts;
pub use connect::MongoConnector;
pub use error::{Result, SeedError};
pub use insert::{insert_documents, InsertOptions, InsertOutcome, SeedResult};
pub use provision::ensure_collection;
pub use seeder::{SeedReport, Seeder};
pub use target::{BoxError, Connector, SeedTarget, WriteFailure};

// Re-export the source crate for callers that resolve input themselves
pub use mongo_seed_source as source;
pub use mongo_seed_source::{CollectionTask, SeedData, SeedSource};
