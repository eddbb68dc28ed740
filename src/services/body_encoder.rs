use crate::constants::headers::CONTENT_TYPE;
use crate::models::ContentType;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPayload {
    Empty,
    Text(String),
    /// Text parts in key order; the transport picks the boundary.
    Multipart(Vec<(String, String)>),
}

impl BodyPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            BodyPayload::Empty => true,
            BodyPayload::Text(text) => text.is_empty(),
            BodyPayload::Multipart(_) => false,
        }
    }
}

/// Note attached to a body that was sent best-effort instead of rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncodingWarning {
    /// JSON body did not parse and went out verbatim.
    InvalidJson { message: String },
    /// Form body has no `key=value` pair.
    SuspiciousFormBody,
    /// No JSON object found for multipart; raw text sent with the configured
    /// Content-Type, so body and header may disagree.
    MultipartFallback { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBody {
    pub payload: BodyPayload,
    pub headers: IndexMap<String, String>,
    pub warnings: Vec<EncodingWarning>,
}

pub fn encode_body(
    content_type: ContentType,
    body: &str,
    headers: &IndexMap<String, String>,
) -> EncodedBody {
    let mut encoded = EncodedBody {
        payload: BodyPayload::Empty,
        headers: headers.clone(),
        warnings: Vec::new(),
    };
    if body.is_empty() {
        return encoded;
    }

    match content_type {
        ContentType::Json => match serde_json::from_str::<Value>(body) {
            Ok(parsed) => {
                encoded.payload = BodyPayload::Text(parsed.to_string());
            }
            Err(err) => {
                encoded.payload = BodyPayload::Text(body.to_string());
                encoded.warnings.push(EncodingWarning::InvalidJson {
                    message: err.to_string(),
                });
            }
        },
        ContentType::FormUrlEncoded => {
            if !body.contains('=') {
                encoded.warnings.push(EncodingWarning::SuspiciousFormBody);
            }
            encoded.payload = BodyPayload::Text(body.to_string());
        }
        ContentType::Multipart => match extract_json_object(body) {
            Some(fields) => {
                let parts = fields
                    .into_iter()
                    .map(|(key, value)| (key, stringify_part(value)))
                    .collect();
                encoded.payload = BodyPayload::Multipart(parts);
                encoded
                    .headers
                    .retain(|key, _| !key.trim().eq_ignore_ascii_case(CONTENT_TYPE));
            }
            None => {
                encoded.payload = BodyPayload::Text(body.to_string());
                encoded.warnings.push(EncodingWarning::MultipartFallback {
                    reason: "no JSON object found in body".to_string(),
                });
            }
        },
    }
    encoded
}

fn stringify_part(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// First balanced `{...}` in `text` that parses as a JSON object.
///
/// Braces inside JSON string literals do not count towards the balance.
pub fn extract_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let bytes = text.as_bytes();
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = matching_brace(bytes, start) {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Some(map);
            }
        }
        search_from = start + 1;
    }
    None
}

fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}
