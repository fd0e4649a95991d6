//! Supabase Auth session provider

use async_trait::async_trait;
use flowdesk_billing::{BillingError, BillingResult, SessionProvider, SessionUser};
use reqwest::Client;
use serde::Deserialize;

/// Response from Supabase /auth/v1/user endpoint
#[derive(Debug, Clone, Deserialize)]
struct SupabaseUserResponse {
    id: String,
    email: Option<String>,
}

/// Resolves users by asking Supabase Auth who owns an access token.
/// Every call goes to Supabase; nothing is cached.
#[derive(Clone)]
pub struct SupabaseSessions {
    http_client: Client,
    supabase_url: String,
    supabase_anon_key: String,
}

impl SupabaseSessions {
    pub fn new(
        http_client: Client,
        supabase_url: impl Into<String>,
        supabase_anon_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            supabase_url: supabase_url.into(),
            supabase_anon_key: supabase_anon_key.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

#[async_trait]
impl SessionProvider for SupabaseSessions {
    async fn current_user(&self, access_token: &str) -> BillingResult<SessionUser> {
        if !self.is_configured() {
            tracing::warn!("Supabase not configured, cannot verify access token");
            return Err(BillingError::Config(
                "SUPABASE_URL or SUPABASE_ANON_KEY missing".to_string(),
            ));
        }

        let url = format!("{}/auth/v1/user", self.supabase_url);

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.supabase_anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to verify Supabase token: {}", e);
                BillingError::Upstream(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::warn!(
                "Supabase token verification failed with status: {}",
                response.status()
            );
            return Err(BillingError::Session);
        }

        let user = response
            .json::<SupabaseUserResponse>()
            .await
            .map_err(|e| BillingError::Upstream(e.to_string()))?;

        Ok(SessionUser {
            id: user.id,
            email: user.email,
        })
    }
}
