//! Classification of seed input and expansion into collection tasks.

use crate::error::{Result, SourceError};
use crate::parse::{collection_name_for, parse_documents, records_to_documents};
use crate::{CollectionTask, SeedData, SeedSource, TaskOrigin};
use extjson_types::NormalizeOptions;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};

const SEED_FILE_EXTENSION: &str = "json";

/// Classify seed input by its shape.
///
/// Returns `Ok(None)` for filesystem entries that are neither a regular file
/// nor a directory (special files, dangling symlinks, symlink loops).
pub async fn classify(
    data: SeedData,
    collection_name: Option<&str>,
) -> Result<Option<SeedSource>> {
    match data {
        SeedData::Records(records) => {
            let collection_name = collection_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    SourceError::Config(
                        "a collection name is required when seeding in-memory records".to_string(),
                    )
                })?;
            Ok(Some(SeedSource::InMemory {
                records,
                collection_name: collection_name.to_string(),
            }))
        }
        SeedData::Path(path) => classify_path(path).await,
    }
}

async fn classify_path(path: PathBuf) -> Result<Option<SeedSource>> {
    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_dir() => Ok(Some(SeedSource::Directory(path))),
        Ok(metadata) if metadata.is_file() => Ok(Some(SeedSource::SingleFile(path))),
        Ok(_) => {
            tracing::warn!(
                "Seed path is neither a file nor a directory, nothing to seed: {}",
                path.display()
            );
            Ok(None)
        }
        Err(e) => {
            let is_symlink = tokio::fs::symlink_metadata(&path)
                .await
                .map(|m| m.file_type().is_symlink())
                .unwrap_or(false);
            if is_symlink {
                tracing::warn!(
                    "Seed path is an unresolvable symlink, nothing to seed: {} ({})",
                    path.display(),
                    e
                );
                Ok(None)
            } else {
                Err(SourceError::file(path, e.to_string()))
            }
        }
    }
}

/// Resolve seed input into collection tasks.
///
/// Directory input is validated in full before any file is read: a single
/// non-`.json` entry fails the whole call with [`SourceError::Format`].
/// `collection_name` overrides the derived name for in-memory and single-file
/// input and is ignored for directories.
pub async fn resolve(
    data: SeedData,
    collection_name: Option<&str>,
    options: &NormalizeOptions,
) -> Result<Vec<CollectionTask>> {
    let Some(source) = classify(data, collection_name).await? else {
        return Ok(Vec::new());
    };

    match source {
        SeedSource::InMemory {
            records,
            collection_name,
        } => {
            let origin = format!("in-memory records for '{collection_name}'");
            let documents = records_to_documents(records, &origin, options)?;
            Ok(vec![CollectionTask::new(
                collection_name,
                documents,
                TaskOrigin::InMemory,
            )])
        }
        SeedSource::SingleFile(path) => {
            let name = match collection_name {
                Some(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => collection_name_for(&path)?,
            };
            let task = load_file_task(path, name, options).await?;
            Ok(vec![task])
        }
        SeedSource::Directory(dir) => {
            if let Some(name) = collection_name {
                tracing::debug!(
                    "Ignoring collection name '{}' for directory seed {}",
                    name,
                    dir.display()
                );
            }
            let files = list_json_files(&dir).await?;
            let loads = files.into_iter().map(|path| async move {
                let name = collection_name_for(&path)?;
                load_file_task(path, name, options).await
            });
            let mut tasks = try_join_all(loads).await?;
            tasks.sort_by(|a, b| a.collection_name.cmp(&b.collection_name));
            tracing::debug!(
                "Resolved {} collection tasks from directory: {}",
                tasks.len(),
                dir.display()
            );
            Ok(tasks)
        }
    }
}

/// List the seed files of a directory (non-recursive, immediate children only).
///
/// Every entry must carry the `.json` extension, subdirectories included;
/// the first one that does not is reported as [`SourceError::Format`].
pub async fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| SourceError::file(dir, format!("failed to read directory: {e}")))?;

    let mut files = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                return Err(SourceError::file(
                    dir,
                    format!("failed to read directory entry: {e}"),
                ))
            }
        };
        let entry_path = entry.path();
        if entry_path.extension().and_then(|ext| ext.to_str()) != Some(SEED_FILE_EXTENSION) {
            return Err(SourceError::Format { path: entry_path });
        }
        files.push(entry_path);
    }

    // Sort for consistent ordering
    files.sort();

    tracing::debug!("Listed {} seed files in directory: {}", files.len(), dir.display());

    Ok(files)
}

async fn load_file_task(
    path: PathBuf,
    collection_name: String,
    options: &NormalizeOptions,
) -> Result<CollectionTask> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| SourceError::file(&path, format!("failed to read file: {e}")))?;
    let documents = parse_documents(&bytes, &path, options)?;
    tracing::debug!(
        "Parsed {} documents for collection '{}' from {}",
        documents.len(),
        collection_name,
        path.display()
    );
    Ok(CollectionTask::new(
        collection_name,
        documents,
        TaskOrigin::File(path),
    ))
}
