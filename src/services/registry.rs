use crate::errors::EngineError;
use crate::models::RegistryEndpoint;
use crate::services::logger::Logger;
use std::path::Path;
use std::sync::Arc;

/// Static endpoint catalog, loaded once at session start.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<Vec<RegistryEndpoint>>,
}

impl Registry {
    pub fn new(entries: Vec<RegistryEndpoint>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Reads a JSON array of entries. A missing file is an empty catalog.
    pub fn from_file(logger: &Logger, path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            logger.warn(
                "Registry file not found, catalog is empty",
                Some(&serde_json::json!({"path": path})),
            );
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|err| {
            EngineError::internal(format!("Failed to read registry: {}", err))
        })?;
        let entries: Vec<RegistryEndpoint> = serde_json::from_str(&raw).map_err(|err| {
            EngineError::invalid_params(format!("Registry file is not a valid catalog: {}", err))
                .with_hint("Expected [{\"category\", \"endpoint\", \"definition\": {\"method\", \"path\"}}]")
        })?;
        logger.info(
            "Registry loaded",
            Some(&serde_json::json!({"path": path, "entries": entries.len()})),
        );
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[RegistryEndpoint] {
        &self.entries
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for entry in self.entries.iter() {
            if !out.contains(&entry.category.as_str()) {
                out.push(entry.category.as_str());
            }
        }
        out
    }

    pub fn find(&self, category: &str, endpoint: &str) -> Option<&RegistryEndpoint> {
        self.entries
            .iter()
            .find(|entry| entry.category == category && entry.endpoint == endpoint)
    }
}
