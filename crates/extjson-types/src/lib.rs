//! JSON → BSON document normalization for seed data.
//!
//! Seed files are plain JSON, but they may embed MongoDB Extended JSON (v2)
//! wrappers such as `{"$oid": "..."}` or `{"$date": "..."}`. This crate turns
//! a parsed `serde_json::Value` into BSON, converting those wrappers into
//! native BSON types so that the stored documents carry real ObjectIds,
//! dates and 64-bit integers instead of nested objects.
//!
//! # Example
//!
//! ```
//! use extjson_types::{json_to_document, NormalizeOptions};
//!
//! let json = serde_json::json!({
//!     "_id": {"$oid": "5f1d7f1f8f1b2c3d4e5f6a7b"},
//!     "code": "AA100",
//! });
//! let doc = json_to_document(json, &NormalizeOptions::default()).unwrap();
//! assert!(doc.get_object_id("_id").is_ok());
//! ```

mod normalize;

pub use normalize::{json_to_bson, json_to_document, NormalizeOptions};
