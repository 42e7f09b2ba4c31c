//! [`QuizStore`] implementations.
//!
//! `InMemoryStore` backs tests and embedded use. `JsonFileStore` keeps the
//! items in one JSON file that any number of handles and processes may share.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::error::StoreError;
use crate::model::QuizItem;
use crate::traits::{AttemptUpdate, Embedding, QuizStore};

/// Quiz items held in memory, keyed by id.
#[derive(Default)]
pub struct InMemoryStore {
    items: RwLock<BTreeMap<String, QuizItem>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `items`.
    pub fn with_items(items: impl IntoIterator<Item = QuizItem>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(|i| (i.id.clone(), i)).collect()),
        }
    }
}

#[async_trait]
impl QuizStore for InMemoryStore {
    async fn get(&self, quiz_id: &str) -> Result<QuizItem, StoreError> {
        self.items
            .read()
            .await
            .get(quiz_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(quiz_id.to_string()))
    }

    async fn insert(&self, item: QuizItem) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        if items.contains_key(&item.id) {
            return Err(StoreError::AlreadyExists(item.id));
        }
        items.insert(item.id.clone(), item);
        Ok(())
    }

    async fn record_attempt(&self, quiz_id: &str, update: &AttemptUpdate) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(quiz_id)
            .ok_or_else(|| StoreError::NotFound(quiz_id.to_string()))?;
        update.apply_to(item)
    }

    async fn replace_embedding(
        &self,
        quiz_id: &str,
        embedding: &Embedding,
    ) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(quiz_id)
            .ok_or_else(|| StoreError::NotFound(quiz_id.to_string()))?;
        item.reference_embedding = embedding.vector.clone();
        item.embedding_model = embedding.model.clone();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<QuizItem>, StoreError> {
        Ok(self.items.read().await.values().cloned().collect())
    }
}

type ItemMap = BTreeMap<String, QuizItem>;

/// Quiz items persisted as a pretty-printed JSON array.
///
/// Nothing is cached: reads go to the file, and every mutation re-reads it
/// while holding an exclusive lock on a sibling `.lock` file, so the
/// compare-and-swap in `record_attempt` sees writes from other processes.
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    /// Serializes writers sharing this handle before they queue on the file lock.
    writer: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let items = read_items(&path)?;
        tracing::debug!("opened store {} ({} items)", path.display(), items.len());
        Ok(Self {
            lock_path: sibling(&path, ".lock"),
            path,
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<ItemMap, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => parse_items(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ItemMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Run `op` against the current file contents under the file lock and
    /// write the result back. Nothing is written when `op` fails.
    async fn mutate<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ItemMap) -> Result<T, StoreError> + Send + 'static,
    {
        let _writer = self.writer.lock().await;
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        tokio::task::spawn_blocking(move || locked_update(&path, &lock_path, op))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }
}

fn locked_update<T>(
    path: &Path,
    lock_path: &Path,
    op: impl FnOnce(&mut ItemMap) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _held = lock.write()?;

    let mut items = read_items(path)?;
    let value = op(&mut items)?;

    let list: Vec<&QuizItem> = items.values().collect();
    let json = serde_json::to_string_pretty(&list)?;
    let tmp = sibling(path, ".tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(value)
}

fn read_items(path: &Path) -> Result<ItemMap, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_items(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ItemMap::new()),
        Err(e) => Err(e.into()),
    }
}

fn parse_items(content: &str) -> Result<ItemMap, StoreError> {
    if content.trim().is_empty() {
        return Ok(ItemMap::new());
    }
    let list: Vec<QuizItem> = serde_json::from_str(content)?;
    Ok(list.into_iter().map(|i| (i.id.clone(), i)).collect())
}

/// `store.json` -> `store.json<suffix>` in the same directory.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("quizgrade-store"));
    name.push(suffix);
    path.with_file_name(name)
}

#[async_trait]
impl QuizStore for JsonFileStore {
    async fn get(&self, quiz_id: &str) -> Result<QuizItem, StoreError> {
        self.load()
            .await?
            .remove(quiz_id)
            .ok_or_else(|| StoreError::NotFound(quiz_id.to_string()))
    }

    async fn insert(&self, item: QuizItem) -> Result<(), StoreError> {
        self.mutate(move |items| {
            if items.contains_key(&item.id) {
                return Err(StoreError::AlreadyExists(item.id));
            }
            items.insert(item.id.clone(), item);
            Ok(())
        })
        .await
    }

    async fn record_attempt(&self, quiz_id: &str, update: &AttemptUpdate) -> Result<(), StoreError> {
        let quiz_id = quiz_id.to_string();
        let update = update.clone();
        self.mutate(move |items| {
            let item = items
                .get_mut(&quiz_id)
                .ok_or_else(|| StoreError::NotFound(quiz_id.clone()))?;
            update.apply_to(item)
        })
        .await
    }

    async fn replace_embedding(
        &self,
        quiz_id: &str,
        embedding: &Embedding,
    ) -> Result<(), StoreError> {
        let quiz_id = quiz_id.to_string();
        let embedding = embedding.clone();
        self.mutate(move |items| {
            let item = items
                .get_mut(&quiz_id)
                .ok_or_else(|| StoreError::NotFound(quiz_id.clone()))?;
            item.reference_embedding = embedding.vector;
            item.embedding_model = embedding.model;
            Ok(())
        })
        .await
    }

    async fn list(&self) -> Result<Vec<QuizItem>, StoreError> {
        Ok(self.load().await?.into_values().collect())
    }
}
