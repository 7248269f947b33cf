pub mod record;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use relative_path::RelativePathBuf;
use smrtfeed_config::Config;
use tokio::sync::Mutex;

use crate::editing::PatchLog;
use crate::error::StoreError;

pub use record::{DecodedDocument, StoredChange, StoredDocument, decode, encode, serialize};

/// Key of a persisted document
///
/// Ids are restricted to ASCII letters, digits, `-` and `_` so they can be used
/// as file names as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Result<Self, StoreError> {
        let id = id.into();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId(id));
        }
        Ok(Self(id))
    }

    /// Fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Durable home for `(baseline, patch log)` records.
///
/// A save writes the whole record, replacing whatever was stored under the id.
/// Loads tolerate damaged change entries (see [`record::decode`]); only a
/// missing record or one without content is an error.
pub trait DocumentStore: Send + Sync + 'static {
    fn load(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<DecodedDocument, StoreError>> + Send;

    fn save(
        &self,
        id: &DocumentId,
        log: &PatchLog,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Keeps encoded records in memory; used for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<DocumentId, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes under `id`, bypassing the encoder
    pub async fn put_raw(&self, id: DocumentId, bytes: impl Into<Vec<u8>>) {
        self.records.lock().await.insert(id, bytes.into());
    }

    /// Raw bytes last saved under `id`
    pub async fn get_raw(&self, id: &DocumentId) -> Option<Vec<u8>> {
        self.records.lock().await.get(id).cloned()
    }
}

impl DocumentStore for MemoryStore {
    async fn load(&self, id: &DocumentId) -> Result<DecodedDocument, StoreError> {
        let records = self.records.lock().await;
        let bytes = records
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(decode(bytes)?)
    }

    async fn save(&self, id: &DocumentId, log: &PatchLog) -> Result<(), StoreError> {
        let bytes = encode(log)?;
        self.records.lock().await.insert(id.clone(), bytes);
        Ok(())
    }
}

/// One pretty-printed JSON file per document: `<root>/<id>.json`
///
/// Saves write a uniquely named `<id>.json.<uuid>.tmp` first and rename it over
/// the record, so an interrupted save leaves the previous record intact and
/// overlapping saves never share a staging file.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.store_path.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the record for `id`
    pub fn path_for(&self, id: &DocumentId) -> PathBuf {
        RelativePathBuf::from(format!("{id}.json")).to_path(&self.root)
    }

    fn staging_path_for(&self, id: &DocumentId) -> PathBuf {
        let nonce = uuid::Uuid::new_v4().simple();
        RelativePathBuf::from(format!("{id}.json.{nonce}.tmp")).to_path(&self.root)
    }
}

impl DocumentStore for FileStore {
    async fn load(&self, id: &DocumentId) -> Result<DecodedDocument, StoreError> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()));
            }
            Err(err) => return Err(StoreError::Io(err)),
        };
        Ok(decode(&bytes)?)
    }

    async fn save(&self, id: &DocumentId, log: &PatchLog) -> Result<(), StoreError> {
        let bytes = encode(log)?;
        let path = self.path_for(id);

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = self.staging_path_for(id);
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &path).await?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}
