use crate::config::EngineConfig;
use crate::constants::{network, protocols::ALLOWED_HTTP};
use crate::errors::EngineError;
use crate::models::{ExecutedResponse, HttpMethod};
use crate::services::body_encoder::BodyPayload;
use crate::services::logger::Logger;
use crate::services::response_decoder::decode_body;
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::Client;
use std::time::{Duration, Instant};
use url::Url;

/// Everything the transport needs: URL already resolved, body already encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub body: BodyPayload,
}

#[derive(Clone)]
pub struct RequestExecutor {
    logger: Logger,
    client: Client,
}

impl RequestExecutor {
    pub fn new(logger: Logger, config: &EngineConfig) -> Result<Self, EngineError> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(network::MAX_REDIRECTS)
        } else {
            reqwest::redirect::Policy::none()
        };
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .redirect(redirect)
            .build()
            .map_err(|err| {
                EngineError::internal(format!("Failed to build HTTP client: {}", err))
            })?;
        Ok(Self {
            logger: logger.child("executor"),
            client,
        })
    }

    /// Runs one request. HTTP error statuses come back as `Ok`.
    pub async fn execute(
        &self,
        request: PreparedRequest,
        sequence: u64,
    ) -> Result<ExecutedResponse, EngineError> {
        let url = parse_url(&request.url)?;
        let headers = headers_to_headermap(&request.headers)?;

        let mut builder = self
            .client
            .request(request.method.to_reqwest(), url)
            .headers(headers);
        if let Some(body) = wire_body(request.method, &request.body) {
            builder = match body {
                BodyPayload::Text(text) => builder.body(text.clone()),
                BodyPayload::Multipart(parts) => {
                    let form = parts.iter().fold(Form::new(), |form, (key, value)| {
                        form.text(key.clone(), value.clone())
                    });
                    builder.multipart(form)
                }
                BodyPayload::Empty => builder,
            };
        }

        self.logger.debug(
            "HTTP request",
            Some(&serde_json::json!({
                "sequence": sequence,
                "method": request.method.as_str(),
                "url": request.url,
            })),
        );

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|err| self.transport_error(err, &request))?;
        let elapsed_ms = (started.elapsed().as_secs_f64() * 1000.0).round() as u64;
        let status = response.status();
        let response_headers = response.headers().clone();
        let payload = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err, &request))?;

        let content_type = response_headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let body = decode_body(content_type, &payload)?;

        self.logger.info(
            "HTTP response",
            Some(&serde_json::json!({
                "sequence": sequence,
                "method": request.method.as_str(),
                "url": request.url,
                "status": status.as_u16(),
                "elapsed_ms": elapsed_ms,
                "body_bytes": payload.len(),
            })),
        );

        Ok(ExecutedResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers: headers_to_map(&response_headers),
            body,
            elapsed_ms,
            method: request.method,
            url: request.url,
            sequence,
        })
    }

    fn transport_error(&self, err: reqwest::Error, request: &PreparedRequest) -> EngineError {
        let mapped = map_reqwest_error(err).with_details(serde_json::json!({
            "method": request.method.as_str(),
            "url": request.url,
        }));
        self.logger.warn(
            "HTTP transport failure",
            Some(&serde_json::json!({"url": request.url, "error": mapped.message})),
        );
        mapped
    }
}

/// Body that actually goes on the wire. GET never carries one.
pub fn wire_body(method: HttpMethod, body: &BodyPayload) -> Option<&BodyPayload> {
    if !method.allows_body() || body.is_empty() {
        return None;
    }
    Some(body)
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        return EngineError::timeout(format!("HTTP request timed out: {}", err));
    }
    if err.is_connect() {
        return EngineError::transport(format!("Connection failed: {}", err))
            .with_hint("Check that the host is reachable and the port is open.");
    }
    if err.is_redirect() {
        return EngineError::transport(format!("Redirect failed: {}", err));
    }
    EngineError::transport(err.to_string())
}

fn parse_url(raw: &str) -> Result<Url, EngineError> {
    let parsed = Url::parse(raw).map_err(|err| {
        EngineError::invalid_params(format!("Invalid URL '{}': {}", raw, err))
            .with_hint("Use an absolute http(s) URL and fill every :placeholder.")
    })?;
    if !scheme_allowed(parsed.scheme()) {
        return Err(EngineError::invalid_params(
            "Only http/https URLs are supported",
        ));
    }
    Ok(parsed)
}

fn scheme_allowed(scheme: &str) -> bool {
    ALLOWED_HTTP
        .iter()
        .any(|allowed| allowed.trim_end_matches(':') == scheme)
}

fn headers_to_headermap(headers: &IndexMap<String, String>) -> Result<HeaderMap, EngineError> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            EngineError::invalid_params(format!("Invalid header name: {}", key))
        })?;
        let val = HeaderValue::from_str(value).map_err(|_| {
            EngineError::invalid_params(format!("Invalid value for header {}", key))
        })?;
        map.insert(name, val);
    }
    Ok(map)
}

/// Flattens response headers to strings; repeated names are comma-joined.
fn headers_to_map(headers: &HeaderMap) -> IndexMap<String, String> {
    let mut map: IndexMap<String, String> = IndexMap::new();
    for (key, value) in headers {
        let text = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(key.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&text);
            })
            .or_insert(text);
    }
    map
}
