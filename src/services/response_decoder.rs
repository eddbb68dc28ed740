use crate::errors::EngineError;
use crate::models::ResponseBody;
use serde_json::Value;

/// `application/json` or any `+json` structured suffix, parameters ignored.
pub fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Turns a raw payload into the body of an `ExecutedResponse`.
///
/// A declared-JSON payload that does not parse fails the whole execution.
pub fn decode_body(content_type: Option<&str>, payload: &[u8]) -> Result<ResponseBody, EngineError> {
    let text = String::from_utf8_lossy(payload);
    let declared_json = content_type.map(is_json_media_type).unwrap_or(false);
    if !declared_json || text.trim().is_empty() {
        return Ok(ResponseBody::Text(text.into_owned()));
    }
    serde_json::from_str::<Value>(&text)
        .map(ResponseBody::Json)
        .map_err(|err| {
            EngineError::decode(format!("Response declared JSON but did not parse: {}", err))
                .with_details(serde_json::json!({
                    "content_type": content_type,
                    "body_bytes": payload.len(),
                }))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineErrorKind;

    #[test]
    fn recognizes_json_media_types() {
        assert!(is_json_media_type("application/json"));
        assert!(is_json_media_type("Application/JSON; charset=utf-8"));
        assert!(is_json_media_type("application/problem+json"));
        assert!(!is_json_media_type("text/json-ish"));
        assert!(!is_json_media_type("text/html"));
    }

    #[test]
    fn json_payload_is_parsed() {
        let body = decode_body(Some("application/json"), br#"{"ok":true}"#).expect("decode");
        assert_eq!(body, ResponseBody::Json(serde_json::json!({"ok": true})));
    }

    #[test]
    fn other_payloads_stay_text() {
        let body = decode_body(Some("text/plain"), br#"{"ok":true}"#).expect("decode");
        assert_eq!(body, ResponseBody::Text("{\"ok\":true}".to_string()));
        let body = decode_body(None, b"hello").expect("decode");
        assert_eq!(body.as_text(), Some("hello"));
    }

    #[test]
    fn broken_json_fails_the_execution() {
        let err = decode_body(Some("application/json"), b"{oops").expect_err("must fail");
        assert_eq!(err.kind, EngineErrorKind::Decode);
    }

    #[test]
    fn empty_json_payload_is_empty_text() {
        let body = decode_body(Some("application/json"), b"").expect("decode");
        assert_eq!(body, ResponseBody::Text(String::new()));
    }
}
