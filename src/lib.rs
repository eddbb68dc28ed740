//! HTTP request construction and execution engine.
//!
//! Compose a request (method, templated URL, params, headers, encoded body),
//! run it against a live endpoint, read back a timed and decoded response,
//! and keep named request definitions in a durable key-value store.

pub mod app;
pub mod config;
pub mod constants;
pub mod errors;
pub mod managers;
pub mod models;
pub mod rpc;
pub mod services;
pub mod stores;
pub mod utils;
