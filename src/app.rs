use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::managers::session::Session;
use crate::services::executor::RequestExecutor;
use crate::services::logger::Logger;
use crate::services::registry::Registry;
use crate::services::token::{EnvTokenProvider, TokenProvider};
use crate::stores::kv_store::{FileKvStore, KeyValueStore};
use crate::stores::request_store::RequestStore;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub config: EngineConfig,
    pub session: Arc<Session>,
}

impl App {
    pub fn initialize() -> Result<Self, EngineError> {
        Self::with_config(EngineConfig::from_env())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        let logger = Logger::new("api-tester");
        let backend: Arc<dyn KeyValueStore> = Arc::new(FileKvStore::new(&config.store_path));
        let tokens: Arc<dyn TokenProvider> = Arc::new(EnvTokenProvider::default());
        Self::assemble(logger, config, backend, tokens)
    }

    /// Builds the app around caller-supplied storage and token collaborators.
    pub fn assemble(
        logger: Logger,
        config: EngineConfig,
        backend: Arc<dyn KeyValueStore>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, EngineError> {
        let registry = match config.registry_path.as_ref() {
            Some(path) => Registry::from_file(&logger.child("registry"), path)?,
            None => Registry::default(),
        };
        let executor = RequestExecutor::new(logger.clone(), &config)?;
        let store = RequestStore::new(logger.clone(), backend);
        let session = Session::new(
            logger.clone(),
            executor,
            store,
            registry,
            tokens,
            &config.base_url,
        );
        logger.info(
            "Engine initialized",
            Some(&serde_json::json!({
                "base_url": config.base_url,
                "store_path": config.store_path,
                "timeout_ms": config.timeout_ms,
                "saved_requests": session.list_saved().len(),
                "registry_entries": session.registry().entries().len(),
            })),
        );
        Ok(Self {
            logger,
            config,
            session: Arc::new(session),
        })
    }
}
