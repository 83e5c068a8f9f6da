//! Seed orchestration.

use crate::config::SeedOpts;
use crate::connect::MongoConnector;
use crate::error::{Result, SeedError};
use crate::insert::{insert_documents, InsertOptions, SeedResult};
use crate::provision::ensure_collection;
use crate::target::{Connector, SeedTarget};
use futures::future::join_all;
use mongo_seed_source::{resolve, CollectionTask, SeedData};
use std::time::{Duration, Instant};

/// Per-collection results of one [`Seeder::seed`] call.
#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    /// One entry per collection task, ordered by collection name for
    /// directory input.
    pub results: Vec<SeedResult>,
    pub duration: Duration,
}

impl SeedReport {
    pub fn get(&self, collection: &str) -> Option<&SeedResult> {
        self.results.iter().find(|r| r.collection == collection)
    }

    pub fn total_inserted(&self) -> u64 {
        self.results.iter().map(|r| r.inserted).sum()
    }

    pub fn total_skipped_duplicates(&self) -> u64 {
        self.results.iter().map(|r| r.skipped_duplicates).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Seeds a database from JSON files, JSON directories or in-memory records.
///
/// # Example
///
/// ```ignore
/// let seeder = Seeder::new(SeedOpts::new("localhost", "cit_test").with_overwrite(true))?;
/// let report = seeder.seed("./json/flights.json", None).await?;
/// println!("inserted {}", report.total_inserted());
/// ```
pub struct Seeder<C: Connector = MongoConnector> {
    connector: C,
    opts: SeedOpts,
}

impl Seeder<MongoConnector> {
    /// Create a MongoDB seeder. Fails with [`SeedError::Config`] on invalid
    /// options; no connection is made until a seed call.
    pub fn new(opts: SeedOpts) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            connector: MongoConnector::new(opts.clone()),
            opts,
        })
    }
}

impl<C: Connector> Seeder<C> {
    /// Create a seeder over a custom connector.
    pub fn with_connector(connector: C, opts: SeedOpts) -> Result<Self> {
        opts.validate()?;
        Ok(Self { connector, opts })
    }

    pub fn opts(&self) -> &SeedOpts {
        &self.opts
    }

    fn insert_options(&self) -> InsertOptions {
        InsertOptions {
            overwrite: self.opts.overwrite,
            verbose: self.opts.verbose,
            max_concurrency: self.opts.max_concurrent_inserts,
        }
    }

    /// Seed the database.
    ///
    /// `data` is either in-memory records, which require `collection_name`,
    /// or a path to a JSON file or a directory of JSON files. A fresh
    /// connection is opened for the call and shut down before returning.
    ///
    /// All input is resolved before any collection is touched, so a bad
    /// file in a directory fails the call without inserting anything.
    /// Collection tasks then run concurrently; when one fails, the others
    /// are allowed to finish and the first failure in task order is
    /// returned.
    pub async fn seed(
        &self,
        data: impl Into<SeedData>,
        collection_name: Option<&str>,
    ) -> Result<SeedReport> {
        let data = data.into();
        if matches!(data, SeedData::Records(_))
            && collection_name.map_or(true, |name| name.trim().is_empty())
        {
            return Err(SeedError::Config(
                "a collection name is required when seeding in-memory records".to_string(),
            ));
        }

        let start_time = Instant::now();
        let target = self.connector.connect().await?;
        let outcome = self.run(&target, data, collection_name).await;
        target.shutdown().await;

        let mut report = outcome?;
        report.duration = start_time.elapsed();
        tracing::info!(
            "Seeding complete: {} collections, {} inserted, {} duplicates skipped in {:?}",
            report.results.len(),
            report.total_inserted(),
            report.total_skipped_duplicates(),
            report.duration
        );
        Ok(report)
    }

    async fn run(
        &self,
        target: &C::Target,
        data: SeedData,
        collection_name: Option<&str>,
    ) -> Result<SeedReport> {
        let tasks = resolve(data, collection_name, &self.opts.normalize_options()).await?;
        if tasks.is_empty() {
            tracing::info!("No seed data found, nothing to do");
            return Ok(SeedReport::default());
        }

        tracing::info!(
            "Seeding {} collections into database '{}' (overwrite: {})",
            tasks.len(),
            self.connector.database_name(),
            self.opts.overwrite
        );

        let insert_options = self.insert_options();
        let outcomes = join_all(
            tasks
                .into_iter()
                .map(|task| seed_task(target, task, &insert_options)),
        )
        .await;

        let mut report = SeedReport::default();
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    tracing::error!("{}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Drop the whole database.
    pub async fn drop_database(&self) -> Result<()> {
        let target = self.connector.connect().await?;
        tracing::info!("Dropping database: {}", self.connector.database_name());
        let outcome = target
            .drop_database()
            .await
            .map_err(|source| SeedError::DropDatabase {
                database: self.connector.database_name().to_string(),
                source,
            });
        target.shutdown().await;
        outcome
    }
}

/// Provision, then insert. Provisioning always completes first.
async fn seed_task<T>(
    target: &T,
    task: CollectionTask,
    options: &InsertOptions,
) -> Result<SeedResult>
where
    T: SeedTarget + ?Sized,
{
    tracing::debug!(
        "Seeding collection '{}' from {} ({} documents)",
        task.collection_name,
        task.origin,
        task.documents.len()
    );
    ensure_collection(target, &task.collection_name, options.overwrite).await?;
    insert_documents(target, &task.collection_name, task.documents, options).await
}
