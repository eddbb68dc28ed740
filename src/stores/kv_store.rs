use crate::constants::storage::FILE_MODE;
use crate::utils::fs_atomic::atomic_write_text_file;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("failed to read store file: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write store file: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable namespace of opaque string blobs.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
    fn remove(&self, key: &str) -> Result<(), KvError>;
}

#[derive(Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let guard = self.entries.read().unwrap_or_else(|err| err.into_inner());
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut guard = self.entries.write().unwrap_or_else(|err| err.into_inner());
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KvError> {
        let mut guard = self.entries.write().unwrap_or_else(|err| err.into_inner());
        guard.remove(key);
        Ok(())
    }
}

/// One JSON object file; each key maps to a string blob.
///
/// Every write rewrites the file through a temp sibling and rename. A file
/// that is not a JSON object reads as empty.
#[derive(Clone)]
pub struct FileKvStore {
    file_path: PathBuf,
    queue: Arc<Mutex<()>>,
}

impl FileKvStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            queue: Arc::new(Mutex::new(())),
        }
    }

    fn load(&self) -> Result<serde_json::Map<String, Value>, KvError> {
        if !self.file_path.exists() {
            return Ok(serde_json::Map::new());
        }
        let raw = std::fs::read_to_string(&self.file_path).map_err(KvError::Read)?;
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Ok(serde_json::Map::new()),
        }
    }

    fn persist(&self, map: serde_json::Map<String, Value>) -> Result<(), KvError> {
        let data = serde_json::to_string_pretty(&Value::Object(map))?;
        atomic_write_text_file(&self.file_path, &format!("{}\n", data), FILE_MODE)
            .map_err(KvError::Write)
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let _guard = self.queue.lock().unwrap_or_else(|err| err.into_inner());
        let map = self.load()?;
        Ok(map.get(key).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let _guard = self.queue.lock().unwrap_or_else(|err| err.into_inner());
        let mut map = self.load()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.persist(map)
    }

    fn remove(&self, key: &str) -> Result<(), KvError> {
        let _guard = self.queue.lock().unwrap_or_else(|err| err.into_inner());
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.persist(map)?;
        }
        Ok(())
    }
}
