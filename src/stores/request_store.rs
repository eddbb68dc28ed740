use crate::constants::storage::SAVED_REQUESTS_KEY;
use crate::errors::EngineError;
use crate::models::{RequestDefinition, SavedRequest};
use crate::services::logger::Logger;
use crate::stores::kv_store::{KeyValueStore, KvError};
use std::sync::Arc;

/// Named request definitions, kept as one serialized list under a fixed key.
///
/// Every mutation rewrites the whole collection. One writer is assumed.
#[derive(Clone)]
pub struct RequestStore {
    logger: Logger,
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl RequestStore {
    pub fn new(logger: Logger, backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(logger, backend, SAVED_REQUESTS_KEY)
    }

    pub fn with_key(logger: Logger, backend: Arc<dyn KeyValueStore>, key: &str) -> Self {
        Self {
            logger: logger.child("store"),
            backend,
            key: key.to_string(),
        }
    }

    /// All saved requests. Absent, unreadable or corrupt data is an empty list.
    pub fn load_all(&self) -> Vec<SavedRequest> {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                self.logger.warn(
                    "Saved requests unreadable, starting empty",
                    Some(&serde_json::json!({"error": err.to_string()})),
                );
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<SavedRequest>>(&raw) {
            Ok(items) => items,
            Err(err) => {
                self.logger.warn(
                    "Saved requests corrupt, starting empty",
                    Some(&serde_json::json!({"error": err.to_string()})),
                );
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<SavedRequest> {
        self.load_all().into_iter().find(|item| item.id == id)
    }

    /// Upserts by id: a prior entry with the same id is replaced in place.
    pub fn save(&self, definition: &RequestDefinition) -> Result<SavedRequest, EngineError> {
        let saved = SavedRequest::snapshot(definition);
        let mut items = self.load_all();
        match items.iter_mut().find(|item| item.id == saved.id) {
            Some(existing) => *existing = saved.clone(),
            None => items.push(saved.clone()),
        }
        self.write_all(&items)?;
        self.logger.debug(
            "Saved request",
            Some(&serde_json::json!({"id": saved.id, "name": saved.name, "total": items.len()})),
        );
        Ok(saved)
    }

    /// Removes the entry with `id`; returns whether one existed. Deleting the
    /// last entry drops the key altogether.
    pub fn delete(&self, id: &str) -> Result<bool, EngineError> {
        let mut items = self.load_all();
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Ok(false);
        }
        if items.is_empty() {
            self.backend.remove(&self.key).map_err(map_kv_error)?;
        } else {
            self.write_all(&items)?;
        }
        Ok(true)
    }

    fn write_all(&self, items: &[SavedRequest]) -> Result<(), EngineError> {
        let data = serde_json::to_string(items).map_err(|err| map_kv_error(err.into()))?;
        self.backend.set(&self.key, &data).map_err(map_kv_error)
    }
}

fn map_kv_error(err: KvError) -> EngineError {
    EngineError::storage(err.to_string())
}
