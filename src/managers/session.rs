use crate::errors::EngineError;
use crate::models::{
    ContentType, ExecutedResponse, HttpMethod, RegistryEndpoint, RequestDefinition, SavedRequest,
};
use crate::services::body_encoder::EncodingWarning;
use crate::services::composer::compose_request;
use crate::services::executor::RequestExecutor;
use crate::services::importer::import_endpoint;
use crate::services::logger::Logger;
use crate::services::registry::Registry;
use crate::services::token::TokenProvider;
use crate::stores::request_store::RequestStore;
use crate::utils::actions::unknown_action_error;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const SESSION_ACTIONS: &[&str] = &[
    "new",
    "import",
    "registry_list",
    "get",
    "update",
    "execute",
    "last_response",
    "save",
    "list_saved",
    "load",
    "delete",
];

/// What the display slot holds after an execution settles.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Response { response: ExecutedResponse },
    Failed { sequence: u64, error: EngineError },
}

impl ExecutionOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            ExecutionOutcome::Response { response } => response.sequence,
            ExecutionOutcome::Failed { sequence, .. } => *sequence,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub response: ExecutedResponse,
    pub warnings: Vec<EncodingWarning>,
    pub unresolved_placeholders: Vec<String>,
    /// A newer execution had already settled, so the display slot kept it.
    pub stale: bool,
}

/// Wires composition, execution and persistence together for one user.
pub struct Session {
    logger: Logger,
    executor: RequestExecutor,
    store: RequestStore,
    registry: Registry,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
    current: Mutex<RequestDefinition>,
    latest: Mutex<Option<ExecutionOutcome>>,
    sequence: AtomicU64,
}

impl Session {
    pub fn new(
        logger: Logger,
        executor: RequestExecutor,
        store: RequestStore,
        registry: Registry,
        tokens: Arc<dyn TokenProvider>,
        base_url: &str,
    ) -> Self {
        Self {
            logger: logger.child("session"),
            executor,
            store,
            registry,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
            current: Mutex::new(RequestDefinition::new()),
            latest: Mutex::new(None),
            sequence: AtomicU64::new(0),
        }
    }

    pub async fn handle_action(&self, args: Value) -> Result<Value, EngineError> {
        let action = args.get("action");
        match action.and_then(Value::as_str).unwrap_or("") {
            "new" => Ok(serde_json::json!({"success": true, "request": self.new_request()})),
            "import" => self.import_action(&args),
            "registry_list" => Ok(serde_json::json!({
                "success": true,
                "categories": self.registry.categories(),
                "endpoints": self.registry.entries(),
            })),
            "get" => Ok(serde_json::json!({"success": true, "request": self.current()})),
            "update" => {
                let updated = self.update_from_value(&args)?;
                Ok(serde_json::json!({"success": true, "request": updated}))
            }
            "execute" => {
                let report = self.execute().await?;
                Ok(serde_json::json!({"success": true, "result": report}))
            }
            "last_response" => Ok(serde_json::json!({
                "success": true,
                "latest": self.latest_outcome(),
            })),
            "save" => {
                let saved = self.save()?;
                Ok(serde_json::json!({"success": true, "saved": saved}))
            }
            "list_saved" => Ok(serde_json::json!({
                "success": true,
                "saved": self.list_saved(),
            })),
            "load" => {
                let id = required_str(&args, "id")?;
                let loaded = self.load(id)?;
                Ok(serde_json::json!({"success": true, "request": loaded}))
            }
            "delete" => {
                let id = required_str(&args, "id")?;
                let deleted = self.delete(id)?;
                Ok(serde_json::json!({"success": true, "id": id, "deleted": deleted}))
            }
            _ => Err(unknown_action_error(action, SESSION_ACTIONS)),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn current(&self) -> RequestDefinition {
        self.lock_current().clone()
    }

    /// Starts over with a default definition.
    pub fn new_request(&self) -> RequestDefinition {
        self.replace_current(RequestDefinition::new())
    }

    pub fn import(&self, endpoint: &RegistryEndpoint) -> Result<RequestDefinition, EngineError> {
        let definition = import_endpoint(endpoint, &self.base_url)?;
        self.logger.debug(
            "Imported registry endpoint",
            Some(&serde_json::json!({"name": definition.name, "url": definition.url})),
        );
        Ok(self.replace_current(definition))
    }

    /// Edits the working definition in place. The id cannot change.
    pub fn update<F>(&self, edit: F) -> RequestDefinition
    where
        F: FnOnce(&mut RequestDefinition),
    {
        let mut guard = self.lock_current();
        let url_before = guard.url.clone();
        edit(&mut *guard);
        if guard.url != url_before {
            guard.sync_path_params();
        }
        guard.clone()
    }

    /// Runs the working definition and settles the display slot.
    pub async fn execute(&self) -> Result<ExecutionReport, EngineError> {
        let definition = self.current();
        self.execute_definition(&definition).await
    }

    /// Runs `definition` without making it the working copy.
    ///
    /// The sequence number is taken before the first suspend point, so calls
    /// are ordered the way they were issued.
    pub async fn execute_definition(
        &self,
        definition: &RequestDefinition,
    ) -> Result<ExecutionReport, EngineError> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let token = self.tokens.bearer_token().await;
        let composed = compose_request(definition, token.as_deref());
        self.logger.debug(
            "Composed request",
            Some(&serde_json::json!({
                "sequence": sequence,
                "name": definition.name,
                "headers": definition.header_names(),
                "bearer": token.is_some(),
            })),
        );

        if !composed.unresolved_placeholders.is_empty() {
            self.logger.warn(
                "Sending request with unresolved path placeholders",
                Some(&serde_json::json!({
                    "sequence": sequence,
                    "placeholders": composed.unresolved_placeholders,
                })),
            );
        }
        for warning in &composed.warnings {
            self.logger.warn(
                "Body sent best-effort",
                Some(&serde_json::json!({"sequence": sequence, "warning": warning})),
            );
        }

        match self.executor.execute(composed.request, sequence).await {
            Ok(response) => {
                let stale = !self.settle(ExecutionOutcome::Response {
                    response: response.clone(),
                });
                Ok(ExecutionReport {
                    response,
                    warnings: composed.warnings,
                    unresolved_placeholders: composed.unresolved_placeholders,
                    stale,
                })
            }
            Err(err) => {
                self.settle(ExecutionOutcome::Failed {
                    sequence,
                    error: err.clone(),
                });
                Err(err)
            }
        }
    }

    pub fn latest_outcome(&self) -> Option<ExecutionOutcome> {
        self.latest
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub fn save(&self) -> Result<SavedRequest, EngineError> {
        let definition = self.current();
        let saved = self.store.save(&definition)?;
        self.logger.info(
            "Request saved",
            Some(&serde_json::json!({"id": saved.id, "name": saved.name})),
        );
        Ok(saved)
    }

    pub fn list_saved(&self) -> Vec<SavedRequest> {
        self.store.load_all()
    }

    /// Replaces the working definition with a copy of a saved one.
    pub fn load(&self, id: &str) -> Result<RequestDefinition, EngineError> {
        let saved = self
            .store
            .get(id)
            .ok_or_else(|| EngineError::not_found(format!("Saved request not found: {}", id)))?;
        Ok(self.replace_current(saved.to_definition()))
    }

    pub fn delete(&self, id: &str) -> Result<bool, EngineError> {
        let deleted = self.store.delete(id)?;
        if deleted {
            self.logger
                .info("Saved request deleted", Some(&serde_json::json!({"id": id})));
        }
        Ok(deleted)
    }

    /// Stores `outcome` unless a newer execution already settled.
    fn settle(&self, outcome: ExecutionOutcome) -> bool {
        let mut guard = self.latest.lock().unwrap_or_else(|err| err.into_inner());
        let newer_settled = guard
            .as_ref()
            .map(|existing| existing.sequence() > outcome.sequence())
            .unwrap_or(false);
        if newer_settled {
            self.logger.debug(
                "Discarding stale execution result",
                Some(&serde_json::json!({"sequence": outcome.sequence()})),
            );
            return false;
        }
        *guard = Some(outcome);
        true
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, RequestDefinition> {
        self.current.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn replace_current(&self, definition: RequestDefinition) -> RequestDefinition {
        let mut guard = self.lock_current();
        *guard = definition;
        guard.clone()
    }

    fn import_action(&self, args: &Value) -> Result<Value, EngineError> {
        let endpoint = match args.get("entry") {
            Some(entry) if !entry.is_null() => serde_json::from_value::<RegistryEndpoint>(entry.clone())?,
            _ => {
                let category = required_str(args, "category")?;
                let name = required_str(args, "endpoint")?;
                self.registry
                    .find(category, name)
                    .cloned()
                    .ok_or_else(|| {
                        EngineError::not_found(format!(
                            "Registry endpoint not found: {} - {}",
                            category, name
                        ))
                        .with_hint("Use action=registry_list to see the catalog.")
                    })?
            }
        };
        let definition = self.import(&endpoint)?;
        Ok(serde_json::json!({"success": true, "request": definition}))
    }

    fn update_from_value(&self, args: &Value) -> Result<RequestDefinition, EngineError> {
        let patch = RequestPatch::from_value(args)?;
        Ok(self.update(|definition| patch.apply(definition)))
    }
}

/// Field-level edit parsed from an `update` call. Absent fields stay as-is.
#[derive(Debug, Default)]
struct RequestPatch {
    name: Option<String>,
    url: Option<String>,
    method: Option<HttpMethod>,
    headers: Option<IndexMap<String, String>>,
    query_params: Option<IndexMap<String, String>>,
    path_params: Option<IndexMap<String, String>>,
    body: Option<String>,
    content_type: Option<ContentType>,
}

impl RequestPatch {
    fn from_value(args: &Value) -> Result<Self, EngineError> {
        Ok(Self {
            name: optional_str(args, "name")?,
            url: optional_str(args, "url")?,
            method: optional_str(args, "method")?
                .map(|raw| raw.parse::<HttpMethod>())
                .transpose()?,
            headers: optional_map(args, "headers")?,
            query_params: optional_map(args, "queryParams")?,
            path_params: optional_map(args, "pathParams")?,
            body: optional_str(args, "body")?,
            content_type: optional_str(args, "contentType")?
                .map(|raw| raw.parse::<ContentType>())
                .transpose()?,
        })
    }

    fn apply(self, definition: &mut RequestDefinition) {
        if let Some(name) = self.name {
            definition.name = name;
        }
        if let Some(url) = self.url {
            definition.set_url(url);
        }
        if let Some(method) = self.method {
            definition.method = method;
        }
        if let Some(headers) = self.headers {
            definition.headers = headers;
        }
        if let Some(query_params) = self.query_params {
            definition.query_params = query_params;
        }
        if let Some(path_params) = self.path_params {
            // Only placeholders present in the url can be bound.
            for (key, value) in path_params {
                if let Some(slot) = definition.path_params.get_mut(&key) {
                    *slot = value;
                }
            }
        }
        if let Some(body) = self.body {
            definition.body = body;
        }
        if let Some(content_type) = self.content_type {
            definition.content_type = content_type;
        }
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, EngineError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::invalid_params(format!("{} must be a non-empty string", key)))
}

fn optional_str(args: &Value, key: &str) -> Result<Option<String>, EngineError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(EngineError::invalid_params(format!(
            "{} must be a string",
            key
        ))),
    }
}

fn optional_map(args: &Value, key: &str) -> Result<Option<IndexMap<String, String>>, EngineError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(
            map.iter()
                .map(|(k, v)| {
                    let value = match v {
                        Value::String(text) => text.clone(),
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect(),
        )),
        Some(_) => Err(EngineError::invalid_params(format!(
            "{} must be an object of strings",
            key
        ))),
    }
}
