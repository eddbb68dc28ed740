use crate::constants::{network, registry};
use crate::utils::paths::{resolve_registry_path, resolve_store_path};
use std::path::PathBuf;

/// Runtime settings, read from `API_TESTER_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Prefix for URLs of imported registry endpoints.
    pub base_url: String,
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub follow_redirects: bool,
    pub user_agent: String,
    pub store_path: PathBuf,
    pub registry_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: registry::DEFAULT_BASE_URL.to_string(),
            timeout_ms: network::TIMEOUT_API_REQUEST_MS,
            connect_timeout_ms: network::TIMEOUT_CONNECTION_MS,
            follow_redirects: true,
            user_agent: network::USER_AGENT.to_string(),
            store_path: resolve_store_path(),
            registry_path: None,
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(base_url) = read_env("API_TESTER_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = read_env("API_TESTER_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            config.timeout_ms = timeout;
        }
        if let Some(timeout) =
            read_env("API_TESTER_CONNECT_TIMEOUT_MS").and_then(|v| v.parse().ok())
        {
            config.connect_timeout_ms = timeout;
        }
        if let Some(follow) = read_env("API_TESTER_FOLLOW_REDIRECTS").and_then(|v| read_bool(&v)) {
            config.follow_redirects = follow;
        }
        if let Some(agent) = read_env("API_TESTER_USER_AGENT") {
            config.user_agent = agent;
        }
        config.registry_path = resolve_registry_path();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::read_bool;

    #[test]
    fn bool_flags_accept_common_spellings() {
        assert_eq!(read_bool("TRUE"), Some(true));
        assert_eq!(read_bool("off"), Some(false));
        assert_eq!(read_bool("maybe"), None);
    }
}
