use crate::app::App;
use crate::errors::{EngineError, EngineErrorKind, ErrorCode, RpcError};
use crate::managers::session::SESSION_ACTIONS;
use crate::rpc::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::services::logger::Logger;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

const SERVER_NAME: &str = "api-tester";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn map_engine_error(error: &EngineError) -> RpcError {
    let code = match error.kind {
        EngineErrorKind::InvalidParams => ErrorCode::InvalidParams,
        EngineErrorKind::NotFound => ErrorCode::InvalidRequest,
        EngineErrorKind::Transport => ErrorCode::TransportFailed,
        EngineErrorKind::Timeout => ErrorCode::RequestTimeout,
        EngineErrorKind::Storage => ErrorCode::StorageFailed,
        EngineErrorKind::Decode | EngineErrorKind::Internal => ErrorCode::InternalError,
    };
    let data = serde_json::to_value(error).unwrap_or(Value::Null);
    RpcError::new(code, error.message.clone()).with_data(data)
}

fn merge_action(params: &Value, action: &str) -> Value {
    let mut map = params.as_object().cloned().unwrap_or_default();
    map.insert("action".to_string(), Value::String(action.to_string()));
    Value::Object(map)
}

pub struct RpcServer {
    logger: Logger,
    app: Arc<App>,
}

impl RpcServer {
    pub fn new(app: Arc<App>) -> Self {
        Self {
            logger: app.logger.child("rpc"),
            app,
        }
    }

    fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
            "capabilities": {"actions": SESSION_ACTIONS},
            "logging": self.app.logger.stats(),
        })
    }

    async fn handle_call(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        if !SESSION_ACTIONS.contains(&method) {
            return Err(RpcError::new(
                ErrorCode::MethodNotFound,
                format!("Method not found: {}", method),
            ));
        }
        self.app
            .session
            .handle_action(merge_action(params, method))
            .await
            .map_err(|err| map_engine_error(&err))
    }

    /// Answers one line of input; `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let parsed: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(_) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    ErrorCode::ParseError.as_i32(),
                    "Parse error".to_string(),
                    None,
                ))
            }
        };
        let request: JsonRpcRequest = match serde_json::from_value(parsed) {
            Ok(req) => req,
            Err(_) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    ErrorCode::InvalidRequest.as_i32(),
                    "Invalid request".to_string(),
                    None,
                ))
            }
        };

        let id = request.id.clone()?;
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.handle_initialize()),
            "actions/list" => {
                JsonRpcResponse::success(id, serde_json::json!({"actions": SESSION_ACTIONS}))
            }
            method => match self.handle_call(method, &request.params).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(err) => {
                    self.logger.debug(
                        "Call failed",
                        Some(&serde_json::json!({"method": method, "error": err.message})),
                    );
                    JsonRpcResponse::failure(id, err.code.as_i32(), err.message, err.data)
                }
            },
        };
        Some(response)
    }

    /// Line-delimited JSON-RPC until the reader is exhausted.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<(), EngineError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut writer = BufWriter::new(writer);
        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(trimmed).await {
                let payload = serde_json::to_string(&response).unwrap_or_default();
                writer.write_all(payload.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }
}

pub async fn run_stdio() -> Result<(), EngineError> {
    let app = Arc::new(App::initialize()?);
    let server = RpcServer::new(app);
    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}
