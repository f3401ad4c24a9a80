use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::debug;

/// Interface for a durable key-value store private to the application.
pub trait KeyValueStore {
    /// Retrieves the value stored under `key`, or `default` when nothing was stored yet.
    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> impl Future<Output = Result<T>>;

    /// Replaces the value stored under `key`. Returns once the value is durable.
    fn set<T: Serialize>(&self, key: &str, value: &T) -> impl Future<Output = Result<()>>;
}

impl<S: Deref> KeyValueStore for S
where
    S::Target: KeyValueStore,
{
    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> impl Future<Output = Result<T>> {
        self.deref().get(key, default)
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> impl Future<Output = Result<()>> {
        self.deref().set(key, value)
    }
}

/// The main realization of [KeyValueStore]. Every key lives in a single json document which gets
/// rewritten as a whole on each [KeyValueStore::set]. The new document is written next to the old
/// one, synced, and renamed over it, so readers observe either the old or the new version.
///
/// Access from several processes is coordinated with a lock on a sidecar `.lock` file.
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    temp_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self {
            lock_path: sibling(&path, "lock"),
            temp_path: sibling(&path, "tmp"),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open_lock(&self) -> Result<File> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .await
            .with_context(|| format!("Failed to open lock file {:?}", self.lock_path))?;
        Ok(file)
    }

    async fn read_document(&self) -> Result<Map<String, Value>> {
        debug!("Reading {:?}", self.path);
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if bytes.is_empty() {
            return Ok(Map::new());
        }

        // A corrupted document is reported instead of being replaced, otherwise the next write
        // would wipe every stored value.
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Store {:?} doesn't contain a json object", self.path))
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<()> {
        let buffer = serde_json::to_vec(document)?;

        let mut file = File::create(&self.temp_path).await?;
        file.write_all(&buffer).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&self.temp_path, &self.path).await?;
        Ok(())
    }

    async fn get_inner<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        let mut document = self.read_document().await?;
        match document.remove(key) {
            Some(value) => serde_json::from_value(value)
                .with_context(|| format!("Value under {key:?} has an unexpected shape")),
            None => Ok(default),
        }
    }

    async fn set_inner<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut document = self.read_document().await?;
        document.insert(key.to_owned(), serde_json::to_value(value)?);
        self.write_document(&document).await
    }
}

impl KeyValueStore for JsonFileStore {
    async fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        let lock = self.open_lock().await?;
        lock.lock_shared()?;
        let result = self.get_inner(key, default).await;
        lock.unlock_async().await?;
        result
    }

    async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let lock = self.open_lock().await?;
        // Semi-safe acquire-release for the document
        lock.lock_exclusive()?;
        let result = self.set_inner(key, value).await;
        lock.unlock_async().await?;
        result
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}
