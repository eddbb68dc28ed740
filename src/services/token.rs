use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// Source of the bearer token injected at composition time. The engine only
/// reads it; refresh and validation belong to the provider.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    token: Arc<RwLock<Option<String>>>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(normalize(token))),
        }
    }

    pub fn set(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|err| err.into_inner());
        *guard = normalize(token);
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

/// Reads the token from an environment variable on every call.
#[derive(Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: &str) -> Self {
        Self {
            var: var.to_string(),
        }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new("API_TESTER_TOKEN")
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn bearer_token(&self) -> Option<String> {
        normalize(std::env::var(&self.var).ok())
    }
}

fn normalize(token: Option<String>) -> Option<String> {
    let token = token?;
    let trimmed = token.trim();
    let stripped = match (trimmed.get(..7), trimmed.get(7..)) {
        (Some(prefix), Some(rest)) if prefix.eq_ignore_ascii_case("bearer ") => rest.trim(),
        _ => trimmed,
    };
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_normalizes_tokens() {
        let provider = StaticTokenProvider::new(Some("  Bearer abc  ".to_string()));
        assert_eq!(provider.bearer_token().await.as_deref(), Some("abc"));
        provider.set(Some("   ".to_string()));
        assert_eq!(provider.bearer_token().await, None);
        provider.set(Some("xyz".to_string()));
        assert_eq!(provider.bearer_token().await.as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn multibyte_tokens_are_kept_intact() {
        let provider = StaticTokenProvider::new(Some("abcdef€xyz".to_string()));
        assert_eq!(provider.bearer_token().await.as_deref(), Some("abcdef€xyz"));
        provider.set(Some("Bearer ключ".to_string()));
        assert_eq!(provider.bearer_token().await.as_deref(), Some("ключ"));
        provider.set(Some("€".to_string()));
        assert_eq!(provider.bearer_token().await.as_deref(), Some("€"));
    }

    #[tokio::test]
    async fn env_provider_reads_variable() {
        let var = format!("API_TESTER_TEST_TOKEN_{}", uuid::Uuid::new_v4().simple());
        let provider = EnvTokenProvider::new(&var);
        assert_eq!(provider.bearer_token().await, None);
        std::env::set_var(&var, "secret");
        assert_eq!(provider.bearer_token().await.as_deref(), Some("secret"));
        std::env::remove_var(&var);
    }
}
