mod engine_error;
mod rpc_error;

pub use engine_error::{EngineError, EngineErrorKind};
pub use rpc_error::{ErrorCode, RpcError};
