//! Plaintext half of the store: one JSON file per entity type
//!
//! `<base_dir>/<collection>.json` holds `{ "<collection>": { "<id>": { ... } } }`.
//! Every write rewrites the whole file under an exclusive lock on a sibling
//! `.<collection>.json.lock`, and replaces it by rename, so writers from
//! other processes never interleave and readers never see a partial file.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::Value;

use super::{entity_collection_name, DataAccess, ReadOptions, Record};
use crate::classify::EntitySchema;
use crate::error::{StoreError, StoreResult};

/// Accessor over the plaintext JSON files under one base directory
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    base_dir: PathBuf,
}

impl FilesystemStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the file holding `entity_name` records, `None` for a blank name
    pub fn entity_file(&self, entity_name: &str) -> Option<PathBuf> {
        entity_collection_name(entity_name).map(|name| self.base_dir.join(format!("{}.json", name)))
    }

    /// Watch the file holding `entity_name` records
    ///
    /// Returns `None` if the file does not exist yet. The watcher stops when
    /// the returned handle is dropped.
    pub fn watch<F>(&self, entity_name: &str, mut on_change: F) -> StoreResult<Option<RecommendedWatcher>>
    where
        F: FnMut(notify::Event) + Send + 'static,
    {
        let Some(path) = self.entity_file(entity_name) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }

        // Saves replace the file, so watch the directory and filter by path
        let target = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) if event.paths.iter().any(|p| p == &target) => on_change(event),
                Ok(_) => {}
                Err(e) => tracing::warn!("Store file watch error: {}", e),
            },
            notify::Config::default(),
        )?;
        watcher.watch(&self.base_dir, RecursiveMode::NonRecursive)?;

        tracing::debug!(path = %path.display(), "Watching store file");
        Ok(Some(watcher))
    }

    /// Load the entity map, `None` if the file does not exist
    async fn load(&self, path: &Path, collection: &str) -> StoreResult<Option<BTreeMap<String, Record>>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        parse_collection(path, collection, &content).map(Some)
    }

    async fn save(&self, path: &Path, collection: &str, entities: BTreeMap<String, Record>) -> StoreResult<()> {
        let mut document = serde_json::Map::new();
        document.insert(
            collection.to_string(),
            Value::Object(entities.into_iter().map(|(id, r)| (id, Value::Object(r))).collect()),
        );
        let content = serde_json::to_string_pretty(&Value::Object(document))
            .map_err(|e| StoreError::invalid(e.to_string()))?;

        replace_file(path, &content)
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    /// Take the writer lock for the file at `path`
    ///
    /// The lock is released when the returned file is dropped.
    async fn lock(&self, path: &Path) -> StoreResult<File> {
        acquire_lock(&self.base_dir, sibling(path, "lock"))
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    fn locate(&self, schema: &EntitySchema) -> Option<(String, PathBuf)> {
        let collection = entity_collection_name(schema.name)?;
        let path = self.base_dir.join(format!("{}.json", collection));
        Some((collection, path))
    }
}

/// Block until `lock_path` is held exclusively, creating `dir` first
///
/// Locks are per open file, so two stores in one process exclude each other
/// just like two processes do.
pub(crate) async fn acquire_lock(dir: &Path, lock_path: PathBuf) -> std::io::Result<File> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<File> {
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "Creating store directory");
            std::fs::create_dir_all(&dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        file.lock_exclusive()?;
        Ok(file)
    })
    .await
    .map_err(std::io::Error::other)?
}

/// Write `content` to a sibling temp file, then rename it over `path`
///
/// Readers in other processes see either the old or the new file, never a
/// truncated one.
pub(crate) async fn replace_file(path: &Path, content: &str) -> std::io::Result<()> {
    let temp = sibling(path, &format!("tmp.{}", uuid::Uuid::new_v4()));

    tokio::fs::write(&temp, content).await?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e);
    }
    Ok(())
}

/// Hidden file next to `path`: `<dir>/.<file name>.<suffix>`
pub(crate) fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path.file_name().and_then(|name| name.to_str()).unwrap_or("store");
    path.with_file_name(format!(".{}.{}", file_name, suffix))
}

/// Parse a store file into its entity map
///
/// A file without the collection key holds no entities. Anything that is not
/// a JSON object, including an empty file, is malformed.
fn parse_collection(path: &Path, collection: &str, content: &str) -> StoreResult<BTreeMap<String, Record>> {
    let document: Value =
        serde_json::from_str(content).map_err(|e| StoreError::malformed(path, e.to_string()))?;
    let Value::Object(mut document) = document else {
        return Err(StoreError::malformed(path, "top level is not an object"));
    };

    match document.remove(collection) {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(entities)) => entities
            .into_iter()
            .map(|(id, entity)| match entity {
                Value::Object(record) => Ok((id, record)),
                _ => Err(StoreError::malformed(path, format!("entry '{}' is not an object", id))),
            })
            .collect(),
        Some(_) => Err(StoreError::malformed(
            path,
            format!("'{}' is not an object", collection),
        )),
    }
}

#[async_trait]
impl DataAccess for FilesystemStore {
    async fn read(&self, schema: &EntitySchema, id: &str, _options: ReadOptions) -> StoreResult<Option<Record>> {
        let Some((collection, path)) = self.locate(schema) else {
            return Ok(None);
        };
        Ok(self
            .load(&path, &collection)
            .await?
            .and_then(|mut entities| entities.remove(id)))
    }

    async fn read_all(&self, schema: &EntitySchema, _options: ReadOptions) -> StoreResult<BTreeMap<String, Record>> {
        let Some((collection, path)) = self.locate(schema) else {
            return Ok(BTreeMap::new());
        };
        Ok(self.load(&path, &collection).await?.unwrap_or_default())
    }

    async fn write(&self, schema: &EntitySchema, id: &str, record: &Record) -> StoreResult<Record> {
        let Some((collection, path)) = self.locate(schema) else {
            return Ok(Record::new());
        };

        let _lock = self.lock(&path).await?;
        let mut entities = self.load(&path, &collection).await?.unwrap_or_default();
        entities.insert(id.to_string(), record.clone());
        self.save(&path, &collection, entities).await?;

        tracing::debug!(entity = %collection, id, "Plaintext record written");
        Ok(record.clone())
    }

    async fn delete(&self, schema: &EntitySchema, id: &str) -> StoreResult<bool> {
        let Some((collection, path)) = self.locate(schema) else {
            return Ok(false);
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(true) {
            return Ok(false);
        }

        let _lock = self.lock(&path).await?;
        let Some(mut entities) = self.load(&path, &collection).await? else {
            return Ok(false);
        };
        if entities.remove(id).is_none() {
            return Ok(false);
        }
        self.save(&path, &collection, entities).await?;

        tracing::debug!(entity = %collection, id, "Plaintext record deleted");
        Ok(true)
    }
}
