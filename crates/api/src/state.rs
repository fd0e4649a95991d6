//! Application state

use std::sync::Arc;

use flowdesk_billing::{BillingService, StripeConfig};
use flowdesk_shared::PredictionClient;
use reqwest::Client;

use crate::{auth::SupabaseSessions, config::Config};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Client for the hosted chat flow
    pub prediction: PredictionClient,
    /// Billing service (None when STRIPE_SECRET_KEY is not set)
    pub billing: Option<Arc<BillingService>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        // One connection pool for Supabase lookups and the prediction endpoint
        let http_client = Client::new();

        let prediction = PredictionClient::with_client(
            http_client.clone(),
            config.flowise_prediction_url.clone(),
            config.flowise_api_key.clone(),
        );
        if prediction.is_configured() {
            tracing::info!(endpoint = %prediction.endpoint(), "Prediction endpoint configured");
        } else {
            tracing::warn!("FLOWISE_API_KEY not set - chat requests will fail with 'Missing configuration'");
        }

        let sessions = SupabaseSessions::new(
            http_client,
            config.supabase_url.clone(),
            config.supabase_anon_key.clone(),
        );
        if !config.supabase_url.is_empty() && config.supabase_anon_key.is_empty() {
            tracing::warn!("Supabase URL configured but SUPABASE_ANON_KEY is missing - session lookups will fail");
        } else if sessions.is_configured() {
            tracing::info!("Supabase session verification enabled via {}", config.supabase_url);
        }

        let billing = match config.stripe_secret_key.clone().map(StripeConfig::new) {
            Some(Ok(stripe_config)) => {
                let stripe_config = stripe_config.with_api_base(config.stripe_api_base.clone());
                tracing::info!("Stripe billing service initialized");
                Some(Arc::new(BillingService::new(
                    stripe_config,
                    Arc::new(sessions),
                    config.site_url.clone(),
                    prediction.clone(),
                )))
            }
            Some(Err(e)) => {
                tracing::warn!("Stripe billing not configured: {}", e);
                None
            }
            None => {
                tracing::warn!("Stripe billing not configured (missing STRIPE_SECRET_KEY)");
                None
            }
        };

        Self::from_parts(config, prediction, billing)
    }

    /// Assemble state from already-built services
    pub fn from_parts(
        config: Config,
        prediction: PredictionClient,
        billing: Option<Arc<BillingService>>,
    ) -> Self {
        Self {
            config,
            prediction,
            billing,
        }
    }

    /// Get billing service reference
    pub fn billing_service(&self) -> Option<&Arc<BillingService>> {
        self.billing.as_ref()
    }
}
