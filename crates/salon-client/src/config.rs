//! Client configuration injected by the runtime environment.
//!
//! All three values are optional; everything has a fixed fallback so the
//! client can start with zero configuration against a local backend.

use salon_shared::constants::DEFAULT_NAMESPACE;

/// Env: JSON blob describing the backend connection.
pub const ENV_BACKEND_CONFIG: &str = "SALON_BACKEND_CONFIG";

/// Env: application namespace under which all documents live.
pub const ENV_NAMESPACE: &str = "SALON_NAMESPACE";

/// Env: pre-provisioned sign-in token.
pub const ENV_SIGN_IN_TOKEN: &str = "SALON_SIGN_IN_TOKEN";

/// Runtime-injected client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend-connection configuration blob.
    /// Env: `SALON_BACKEND_CONFIG` (JSON)
    /// Default: none (in-process backend).
    pub connection: Option<serde_json::Value>,

    /// Application namespace scoping every document path.
    /// Env: `SALON_NAMESPACE`
    /// Default: `"salon-default"`
    pub namespace: String,

    /// Pre-provisioned sign-in token, tried before anonymous sign-in.
    /// Env: `SALON_SIGN_IN_TOKEN`
    /// Default: none.
    pub sign_in_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            sign_in_token: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = get(ENV_BACKEND_CONFIG) {
            match serde_json::from_str(&raw) {
                Ok(value) => config.connection = Some(value),
                Err(error) => {
                    tracing::warn!(%error, "Invalid SALON_BACKEND_CONFIG, ignoring");
                }
            }
        }

        if let Some(ns) = get(ENV_NAMESPACE) {
            if ns.trim().is_empty() {
                tracing::warn!("Empty SALON_NAMESPACE, using default");
            } else {
                config.namespace = ns;
            }
        }

        if let Some(token) = get(ENV_SIGN_IN_TOKEN) {
            if !token.is_empty() {
                config.sign_in_token = Some(token);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ClientConfig::from_lookup(|_| None);
        assert!(config.connection.is_none());
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert!(config.sign_in_token.is_none());
    }

    #[test]
    fn reads_all_three_values() {
        let config = ClientConfig::from_lookup(|key| match key {
            ENV_BACKEND_CONFIG => Some(r#"{"project":"demo"}"#.to_string()),
            ENV_NAMESPACE => Some("my-app".to_string()),
            ENV_SIGN_IN_TOKEN => Some("tok-1".to_string()),
            _ => None,
        });
        assert_eq!(config.connection.unwrap()["project"], "demo");
        assert_eq!(config.namespace, "my-app");
        assert_eq!(config.sign_in_token.as_deref(), Some("tok-1"));
    }

    #[test]
    fn invalid_blob_and_empty_namespace_fall_back() {
        let config = ClientConfig::from_lookup(|key| match key {
            ENV_BACKEND_CONFIG => Some("{not json".to_string()),
            ENV_NAMESPACE => Some("   ".to_string()),
            ENV_SIGN_IN_TOKEN => Some(String::new()),
            _ => None,
        });
        assert!(config.connection.is_none());
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert!(config.sign_in_token.is_none());
    }
}
