//! Duplicate-tolerant bulk insert.

use crate::error::{Result, SeedError};
use crate::target::{SeedTarget, WriteFailure};
use bson::Document;
use futures::StreamExt;
use std::pin::pin;

/// Options for [`insert_documents`].
#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
    /// The collection was emptied beforehand; duplicates are unexpected.
    pub overwrite: bool,
    /// Log each duplicate-key conflict at `info` instead of `debug`.
    pub verbose: bool,
    /// Maximum number of in-flight inserts. `None` starts all at once.
    pub max_concurrency: Option<usize>,
}

/// Result of a single document insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Failed(WriteFailure),
}

/// Aggregate result of seeding one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub collection: String,
    pub inserted: u64,
    pub skipped_duplicates: u64,
    /// False once a non-duplicate failure has been recorded.
    pub success: bool,
}

impl SeedResult {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            inserted: 0,
            skipped_duplicates: 0,
            success: true,
        }
    }

    /// Fold one outcome into the aggregate.
    ///
    /// Duplicate keys are counted and absorbed; any other failure marks the
    /// result unsuccessful and is handed back to the caller.
    pub fn record(
        &mut self,
        outcome: InsertOutcome,
        verbose: bool,
    ) -> std::result::Result<(), WriteFailure> {
        match outcome {
            InsertOutcome::Inserted => {
                self.inserted += 1;
                Ok(())
            }
            InsertOutcome::Failed(WriteFailure::DuplicateKey { message }) => {
                self.skipped_duplicates += 1;
                if verbose {
                    tracing::info!("Skipping duplicate in '{}': {}", self.collection, message);
                } else {
                    tracing::debug!("Skipping duplicate in '{}': {}", self.collection, message);
                }
                Ok(())
            }
            InsertOutcome::Failed(failure) => {
                self.success = false;
                Err(failure)
            }
        }
    }
}

/// Insert `documents` into `collection`, concurrently and in no particular order.
///
/// The first non-duplicate failure stops the aggregation: inserts still in
/// flight for this collection are dropped and the failure is returned as
/// [`SeedError::Insert`].
pub async fn insert_documents<T>(
    target: &T,
    collection: &str,
    documents: Vec<Document>,
    options: &InsertOptions,
) -> Result<SeedResult>
where
    T: SeedTarget + ?Sized,
{
    let total = documents.len();
    let limit = options.max_concurrency.unwrap_or(total).max(1);

    tracing::debug!(
        "Inserting {} documents into '{}' (concurrency: {})",
        total,
        collection,
        limit
    );

    let mut outcomes = pin!(futures::stream::iter(documents)
        .map(|document| async move {
            match target.insert_document(collection, document).await {
                Ok(()) => InsertOutcome::Inserted,
                Err(failure) => InsertOutcome::Failed(failure),
            }
        })
        .buffer_unordered(limit));

    let mut result = SeedResult::new(collection);
    while let Some(outcome) = outcomes.next().await {
        tracing::trace!("Insert outcome for '{}': {:?}", collection, outcome);
        result
            .record(outcome, options.verbose)
            .map_err(|failure| SeedError::Insert {
                collection: collection.to_string(),
                failure,
            })?;
    }

    if result.skipped_duplicates > 0 {
        if options.overwrite {
            tracing::warn!(
                "{} duplicate-key conflicts in freshly recreated collection '{}'",
                result.skipped_duplicates,
                collection
            );
        } else {
            tracing::info!(
                "{} documents already present in '{}' were skipped",
                result.skipped_duplicates,
                collection
            );
        }
    }

    tracing::info!(
        "Seeded collection '{}': {} inserted, {} duplicates skipped",
        collection,
        result.inserted,
        result.skipped_duplicates
    );

    Ok(result)
}
