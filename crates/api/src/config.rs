//! Server configuration
//!
//! Read once from the process environment at startup and injected into the
//! handlers through [`crate::AppState`].

use std::net::SocketAddr;

use flowdesk_shared::{SiteUrl, DEFAULT_PREDICTION_URL};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Clone)]
pub struct Config {
    pub bind_address: String,
    /// Public base URL of the web app, used for redirect targets
    pub site_url: SiteUrl,
    /// Bearer token for the prediction endpoint. Chat requests answer
    /// "Missing configuration" while this is unset.
    pub flowise_api_key: Option<String>,
    pub flowise_prediction_url: String,
    /// Billing routes are disabled while this is unset
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: Option<String>,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub allowed_origins: Vec<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("site_url", &self.site_url.base())
            .field("flowise_api_key", &self.flowise_api_key.is_some())
            .field("flowise_prediction_url", &self.flowise_prediction_url)
            .field("stripe_secret_key", &self.stripe_secret_key.is_some())
            .field("stripe_api_base", &self.stripe_api_base)
            .field("supabase_url", &self.supabase_url)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_address =
            non_empty("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        bind_address
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDRESS",
                reason: e.to_string(),
            })?;

        let site_url_value = non_empty("NEXT_PUBLIC_SITE_URL").or_else(|| non_empty("SITE_URL"));
        let site_url = SiteUrl::from_env_value(site_url_value.as_deref());

        let flowise_prediction_url = non_empty("FLOWISE_PREDICTION_URL")
            .unwrap_or_else(|| DEFAULT_PREDICTION_URL.to_string());
        if !flowise_prediction_url.starts_with("http://")
            && !flowise_prediction_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                var: "FLOWISE_PREDICTION_URL",
                reason: "must be an http(s) URL".to_string(),
            });
        }

        let allowed_origins = non_empty("ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            bind_address,
            site_url,
            flowise_api_key: non_empty("FLOWISE_API_KEY"),
            flowise_prediction_url,
            stripe_secret_key: non_empty("STRIPE_SECRET_KEY"),
            stripe_api_base: non_empty("STRIPE_API_BASE"),
            supabase_url: non_empty("SUPABASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            supabase_anon_key: non_empty("SUPABASE_ANON_KEY").unwrap_or_default(),
            allowed_origins,
        })
    }

    /// Configuration for tests: no secrets, local defaults
    pub fn for_tests() -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_string(),
            site_url: SiteUrl::from_env_value(Some("http://localhost:3000")),
            flowise_api_key: None,
            flowise_prediction_url: DEFAULT_PREDICTION_URL.to_string(),
            stripe_secret_key: None,
            stripe_api_base: None,
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.site_url.base(), "http://localhost:3000");
        assert_eq!(config.flowise_prediction_url, DEFAULT_PREDICTION_URL);
        assert!(config.flowise_api_key.is_none());
        assert!(config.stripe_secret_key.is_none());
        assert_eq!(config.allowed_origins.len(), 2);
    }

    #[test]
    fn test_blank_secrets_count_as_missing() {
        let config = Config::from_lookup(lookup(&[
            ("FLOWISE_API_KEY", "  "),
            ("STRIPE_SECRET_KEY", ""),
        ]))
        .unwrap();

        assert!(config.flowise_api_key.is_none());
        assert!(config.stripe_secret_key.is_none());
    }

    #[test]
    fn test_site_url_prefers_public_variable() {
        let config = Config::from_lookup(lookup(&[
            ("NEXT_PUBLIC_SITE_URL", "app.example.com/"),
            ("SITE_URL", "https://other.example.com"),
            ("SUPABASE_URL", "https://project.supabase.co/"),
        ]))
        .unwrap();

        assert_eq!(config.site_url.base(), "https://app.example.com");
        assert_eq!(config.supabase_url, "https://project.supabase.co");
    }

    #[test]
    fn test_invalid_bind_address_is_rejected() {
        let result = Config::from_lookup(lookup(&[("BIND_ADDRESS", "not-an-address")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                var: "BIND_ADDRESS",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_prediction_url_is_rejected() {
        let result = Config::from_lookup(lookup(&[("FLOWISE_PREDICTION_URL", "ftp://x")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::from_lookup(lookup(&[
            ("FLOWISE_API_KEY", "flowise-secret"),
            ("STRIPE_SECRET_KEY", "sk_live_secret"),
        ]))
        .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("flowise-secret"));
        assert!(!rendered.contains("sk_live_secret"));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var("FLOWISE_API_KEY", "env-key");
        std::env::set_var("ALLOWED_ORIGINS", "https://a.example.com, https://b.example.com");

        let config = Config::from_env().unwrap();

        std::env::remove_var("FLOWISE_API_KEY");
        std::env::remove_var("ALLOWED_ORIGINS");

        assert_eq!(config.flowise_api_key.as_deref(), Some("env-key"));
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example.com", "https://b.example.com"]
        );
    }
}
