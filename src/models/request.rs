use crate::constants::headers::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, DEFAULT_ACCEPT};
use crate::errors::EngineError;
use crate::utils::url_template::sync_path_params;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn allows_body(self) -> bool {
        self != HttpMethod::Get
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == normalized)
            .ok_or_else(|| {
                EngineError::invalid_params(format!("Unsupported HTTP method: {}", raw.trim()))
                    .with_hint("Use one of: GET, POST, PUT, PATCH, DELETE.")
            })
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body encodings the engine knows how to put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContentType {
    #[default]
    #[serde(rename = "application/json", alias = "json")]
    Json,
    #[serde(rename = "application/x-www-form-urlencoded", alias = "form")]
    FormUrlEncoded,
    #[serde(rename = "multipart/form-data", alias = "multipart")]
    Multipart,
}

impl ContentType {
    pub fn mime(self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::FormUrlEncoded => "application/x-www-form-urlencoded",
            ContentType::Multipart => "multipart/form-data",
        }
    }
}

impl FromStr for ContentType {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "json" | "application/json" => Ok(ContentType::Json),
            "form" | "urlencoded" | "application/x-www-form-urlencoded" => {
                Ok(ContentType::FormUrlEncoded)
            }
            "multipart" | "form-data" | "multipart/form-data" => Ok(ContentType::Multipart),
            other => Err(EngineError::invalid_params(format!(
                "Unsupported content type: {}",
                other
            ))
            .with_hint("Use json, form or multipart.")),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Editable description of one HTTP request.
///
/// The maps are the only copy of headers and params; ordered key lists are
/// derived from them on demand. `id` has no setter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDefinition {
    id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    #[serde(default)]
    pub query_params: IndexMap<String, String>,
    #[serde(default)]
    pub path_params: IndexMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub content_type: ContentType,
}

impl Default for RequestDefinition {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestDefinition {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: "New Request".to_string(),
            url: String::new(),
            method: HttpMethod::Get,
            headers: baseline_headers(),
            query_params: IndexMap::new(),
            path_params: IndexMap::new(),
            body: String::new(),
            content_type: ContentType::Json,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replaces the URL template and re-derives the path params from it.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
        self.sync_path_params();
    }

    /// Makes `path_params` hold exactly the placeholders of `url`, keeping
    /// values of placeholders that are still present.
    pub fn sync_path_params(&mut self) {
        self.path_params = sync_path_params(&self.url, &self.path_params);
    }

    pub fn reset_headers(&mut self) {
        self.headers = baseline_headers();
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets a header, replacing any entry whose name differs only by case.
    pub fn set_header(&mut self, name: &str, value: &str) {
        let existing = self
            .headers
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned();
        match existing {
            Some(key) => {
                self.headers.insert(key, value.to_string());
            }
            None => {
                self.headers.insert(name.to_string(), value.to_string());
            }
        }
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        let key = self
            .headers
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()?;
        self.headers.shift_remove(&key)
    }

    pub fn apply_bearer_token(&mut self, token: &str) {
        self.set_header(AUTHORIZATION, &format!("Bearer {}", token));
    }

    pub fn header_names(&self) -> Vec<&str> {
        self.headers.keys().map(String::as_str).collect()
    }

    /// Headers that go on the wire: empty names are editing leftovers.
    pub fn effective_headers(&self) -> IndexMap<String, String> {
        self.headers
            .iter()
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, value)| (key.trim().to_string(), value.clone()))
            .collect()
    }
}

fn baseline_headers() -> IndexMap<String, String> {
    let mut headers = IndexMap::new();
    headers.insert(ACCEPT.to_string(), DEFAULT_ACCEPT.to_string());
    headers.insert(
        CONTENT_TYPE.to_string(),
        ContentType::Json.mime().to_string(),
    );
    headers
}

/// Persisted snapshot of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRequest {
    pub id: String,
    pub name: String,
    pub request: RequestDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

impl SavedRequest {
    pub fn snapshot(definition: &RequestDefinition) -> Self {
        Self {
            id: definition.id().to_string(),
            name: definition.name.clone(),
            request: definition.clone(),
            saved_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Working copy of the stored definition, with path params re-synced.
    pub fn to_definition(&self) -> RequestDefinition {
        let mut definition = self.request.clone();
        definition.sync_path_params();
        definition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_definition_has_baseline_headers() {
        let definition = RequestDefinition::new();
        assert_eq!(definition.method, HttpMethod::Get);
        assert_eq!(definition.header_names(), vec!["Accept", "Content-Type"]);
        assert!(definition.body.is_empty());
        assert_eq!(definition.content_type, ContentType::Json);
        assert!(!definition.id().is_empty());
    }

    #[test]
    fn set_url_resyncs_path_params() {
        let mut definition = RequestDefinition::new();
        definition.set_url("/users/:id/posts/:postId");
        definition.path_params.insert("id".to_string(), "42".to_string());
        definition.set_url("/users/:id/comments/:commentId");
        let keys: Vec<&str> = definition.path_params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "commentId"]);
        assert_eq!(definition.path_params["id"], "42");
        assert_eq!(definition.path_params["commentId"], "");
    }

    #[test]
    fn set_header_is_case_insensitive() {
        let mut definition = RequestDefinition::new();
        definition.set_header("content-type", "text/plain");
        assert_eq!(definition.headers.len(), 2);
        assert_eq!(definition.header("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(
            definition.remove_header("content-TYPE").as_deref(),
            Some("text/plain")
        );
        assert_eq!(definition.header_names(), vec!["Accept"]);
    }

    #[test]
    fn bearer_token_overwrites_existing_authorization() {
        let mut definition = RequestDefinition::new();
        definition.set_header("authorization", "Basic abc");
        definition.apply_bearer_token("tok");
        assert_eq!(definition.header("Authorization"), Some("Bearer tok"));
        assert_eq!(definition.headers.len(), 3);
    }

    #[test]
    fn effective_headers_skip_blank_names() {
        let mut definition = RequestDefinition::new();
        definition.headers.insert(String::new(), "draft".to_string());
        assert_eq!(definition.effective_headers().len(), 2);
    }

    #[test]
    fn method_and_content_type_parse_leniently() {
        assert_eq!("patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("TRACE".parse::<HttpMethod>().is_err());
        assert_eq!("form".parse::<ContentType>().unwrap(), ContentType::FormUrlEncoded);
        assert_eq!(
            "multipart/form-data".parse::<ContentType>().unwrap(),
            ContentType::Multipart
        );
    }

    #[test]
    fn serializes_with_camel_case_and_mime_strings() {
        let mut definition = RequestDefinition::with_id("req-1");
        definition.content_type = ContentType::FormUrlEncoded;
        definition.method = HttpMethod::Post;
        let value = serde_json::to_value(&definition).expect("serialize");
        assert_eq!(value["id"], "req-1");
        assert_eq!(value["method"], "POST");
        assert_eq!(value["contentType"], "application/x-www-form-urlencoded");
        assert!(value.get("queryParams").is_some());
        assert!(value.get("pathParams").is_some());

        let parsed: RequestDefinition = serde_json::from_value(value).expect("deserialize");
        assert_eq!(parsed, definition);
    }

    #[test]
    fn saved_request_reload_resyncs_stale_path_params() {
        let raw = serde_json::json!({
            "id": "r1",
            "name": "Orders",
            "request": {
                "id": "r1",
                "name": "Orders",
                "url": "/orders/:orderId",
                "pathParams": {"stale": "x"}
            }
        });
        let saved: SavedRequest = serde_json::from_value(raw).expect("deserialize");
        let definition = saved.to_definition();
        let keys: Vec<&str> = definition.path_params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["orderId"]);
        assert_eq!(definition.method, HttpMethod::Get);
    }
}
