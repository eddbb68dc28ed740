use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    InvalidParams,
    NotFound,
    Transport,
    Timeout,
    Decode,
    Storage,
    Internal,
}

/// Failure of an engine operation.
///
/// HTTP error statuses never end up here: a 4xx/5xx reply is a complete
/// `ExecutedResponse`. Only transport failures, undecodable JSON replies and
/// caller mistakes that cannot be put on the wire are errors.
#[derive(Debug, Clone, Serialize)]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub retryable: bool,
}

impl EngineError {
    pub fn new(
        kind: EngineErrorKind,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
            retryable: matches!(kind, EngineErrorKind::Transport | EngineErrorKind::Timeout),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::InvalidParams, "INVALID_PARAMS", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::NotFound, "NOT_FOUND", message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Transport, "TRANSPORT", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Timeout, "TIMEOUT", message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Decode, "DECODE", message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Storage, "STORAGE", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Internal, "INTERNAL", message)
    }

    /// True for failures that happened before or during the network round trip.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            EngineErrorKind::Transport | EngineErrorKind::Timeout
        )
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::internal(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::invalid_params(format!("Invalid JSON: {}", err))
    }
}
