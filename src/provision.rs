//! Collection provisioning ahead of inserts.

use crate::error::{Result, SeedError};
use crate::target::{BoxError, SeedTarget};

fn provision_error(collection: &str, source: BoxError) -> SeedError {
    SeedError::Provision {
        collection: collection.to_string(),
        source,
    }
}

/// Make sure `collection` is ready to receive seed documents.
///
/// Without `overwrite` this is a no-op: the server creates the collection on
/// first insert. With `overwrite`, an existing collection is dropped and
/// recreated empty, which discards its documents and secondary indexes. A
/// collection that does not exist yet is left for implicit creation.
pub async fn ensure_collection<T>(target: &T, collection: &str, overwrite: bool) -> Result<()>
where
    T: SeedTarget + ?Sized,
{
    if !overwrite {
        return Ok(());
    }

    let names = target
        .list_collection_names()
        .await
        .map_err(|e| provision_error(collection, e))?;

    if !names.iter().any(|name| name == collection) {
        tracing::debug!(
            "Collection '{}' does not exist yet, nothing to drop",
            collection
        );
        return Ok(());
    }

    tracing::info!("Dropping collection: {}", collection);
    target
        .drop_collection(collection)
        .await
        .map_err(|e| provision_error(collection, e))?;

    tracing::info!("Recreating collection: {}", collection);
    target
        .create_collection(collection)
        .await
        .map_err(|e| provision_error(collection, e))?;

    Ok(())
}
