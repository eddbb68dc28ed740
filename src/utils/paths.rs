use std::env;
use std::path::PathBuf;

fn normalize_env_path(value: Option<String>) -> Option<PathBuf> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    if lowered == "undefined" || lowered == "null" {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn resolve_xdg_state_dir() -> Option<PathBuf> {
    if let Some(path) = normalize_env_path(env::var("XDG_STATE_HOME").ok()) {
        return Some(path);
    }
    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("state"))
}

pub fn resolve_state_dir() -> PathBuf {
    if let Some(path) = normalize_env_path(env::var("API_TESTER_STATE_DIR").ok()) {
        return path;
    }
    if let Some(path) = resolve_xdg_state_dir() {
        return path.join("api-tester");
    }
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// File backing the durable key-value namespace.
pub fn resolve_store_path() -> PathBuf {
    if let Some(path) = normalize_env_path(env::var("API_TESTER_STORE_PATH").ok()) {
        return path;
    }
    resolve_state_dir().join("store.json")
}

pub fn resolve_registry_path() -> Option<PathBuf> {
    normalize_env_path(env::var("API_TESTER_REGISTRY_PATH").ok())
}
