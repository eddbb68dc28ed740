pub mod kv_store;
pub mod request_store;
