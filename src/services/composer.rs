use crate::models::RequestDefinition;
use crate::services::body_encoder::{encode_body, EncodingWarning};
use crate::services::executor::PreparedRequest;
use crate::utils::url_template::{resolve_url, unresolved_placeholders};

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedRequest {
    pub request: PreparedRequest,
    pub warnings: Vec<EncodingWarning>,
    /// Placeholders sent as-is because no value was bound.
    pub unresolved_placeholders: Vec<String>,
}

/// Turns a working definition into a wire-ready request.
///
/// The definition itself is not touched; the bearer token, when present,
/// overwrites any Authorization header on the copy.
pub fn compose_request(definition: &RequestDefinition, token: Option<&str>) -> ComposedRequest {
    let mut working = definition.clone();
    if let Some(token) = token {
        working.apply_bearer_token(token);
    }

    let url = resolve_url(&working.url, &working.path_params, &working.query_params);
    let encoded = encode_body(
        working.content_type,
        &working.body,
        &working.effective_headers(),
    );

    ComposedRequest {
        request: PreparedRequest {
            method: working.method,
            url,
            headers: encoded.headers,
            body: encoded.payload,
        },
        warnings: encoded.warnings,
        unresolved_placeholders: unresolved_placeholders(&working.url, &working.path_params),
    }
}
