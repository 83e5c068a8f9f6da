//! MongoDB implementation of [`SeedTarget`].

use crate::target::{BoxError, SeedTarget, WriteFailure};
use async_trait::async_trait;
use bson::Document;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure as MongoWriteFailure};
use mongodb::options::{Acknowledgment, CollectionOptions, WriteConcern};
use mongodb::{Client, Collection, Database};

/// A connected MongoDB database.
pub struct MongoTarget {
    client: Client,
    database: Database,
}

impl MongoTarget {
    pub fn new(client: Client, database: Database) -> Self {
        Self { client, database }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Collection handle whose writes are acknowledged by the primary only.
    fn insert_collection(&self, collection: &str) -> Collection<Document> {
        let write_concern = WriteConcern::builder()
            .w(Acknowledgment::Nodes(1))
            .build();
        let options = CollectionOptions::builder()
            .write_concern(write_concern)
            .build();
        self.database.collection_with_options(collection, options)
    }
}

#[async_trait]
impl SeedTarget for MongoTarget {
    async fn list_collection_names(&self) -> Result<Vec<String>, BoxError> {
        Ok(self.database.list_collection_names().await?)
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), BoxError> {
        self.database
            .collection::<Document>(collection)
            .drop()
            .await?;
        Ok(())
    }

    async fn create_collection(&self, collection: &str) -> Result<(), BoxError> {
        self.database.create_collection(collection).await?;
        Ok(())
    }

    async fn insert_document(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<(), WriteFailure> {
        self.insert_collection(collection)
            .insert_one(document)
            .await
            .map(|_| ())
            .map_err(classify_write_error)
    }

    async fn drop_database(&self) -> Result<(), BoxError> {
        self.database.drop().await?;
        Ok(())
    }

    async fn shutdown(&self) {
        tracing::debug!("Shutting down MongoDB client");
        self.client.clone().shutdown().await;
    }
}

/// Map a driver error onto the seeder's write failure classification.
pub fn classify_write_error(err: MongoError) -> WriteFailure {
    match err.kind.as_ref() {
        ErrorKind::Write(MongoWriteFailure::WriteError(write_error)) => {
            WriteFailure::from_code(Some(write_error.code), write_error.message.clone())
        }
        ErrorKind::Write(MongoWriteFailure::WriteConcernError(concern_error)) => {
            WriteFailure::Other {
                code: Some(concern_error.code),
                message: concern_error.message.clone(),
            }
        }
        ErrorKind::Command(command_error) => {
            WriteFailure::from_code(Some(command_error.code), command_error.message.clone())
        }
        _ => WriteFailure::Other {
            code: None,
            message: err.to_string(),
        },
    }
}
