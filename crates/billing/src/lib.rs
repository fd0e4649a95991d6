// Billing crate clippy configuration
#![allow(clippy::result_large_err)] // BillingError::QuotaExceeded carries usage figures
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Flowdesk Billing Module
//!
//! Wraps Stripe for the web app's payment flows.
//!
//! ## Features
//!
//! - **Checkout**: Hosted checkout for subscription and one-time prices
//! - **Billing Portal**: Self-service subscription management
//! - **Metered Usage**: Character-based usage records for chat questions
//!
//! Every flow reports failures as an error redirect for the frontend
//! instead of returning an error.

pub mod checkout;
pub mod client;
pub mod customer;
pub mod error;
pub mod metered;
pub mod portal;
pub mod price;
pub mod provider;

#[cfg(test)]
mod testing;

// Checkout
pub use checkout::{
    build_checkout_params, calculate_trial_end, CheckoutMode, CheckoutParams, CheckoutResponse,
    CheckoutService, DEFAULT_REDIRECT_PATH,
};

// Client
pub use client::{StripeClient, StripeConfig};

// Customer
pub use customer::{CustomerService, ResolvedCustomer};

// Error
pub use error::{BillingError, BillingResult};

// Metered
pub use metered::{
    AnswerAccumulator, MeteredBillingService, UsageResponse, DEFAULT_USAGE_THRESHOLD,
};

// Portal
pub use portal::{PortalResponse, PortalService};

// Price
pub use price::{Price, PriceType};

// Providers
pub use provider::{BillingProvider, SessionProvider, SessionUser};

use std::sync::Arc;

use flowdesk_shared::{PredictionClient, SiteUrl};

/// Main billing service that combines all billing functionality
#[derive(Clone)]
pub struct BillingService {
    pub checkout: CheckoutService,
    pub customer: CustomerService,
    pub metered: MeteredBillingService,
    pub portal: PortalService,
}

impl BillingService {
    /// Create a billing service backed by Stripe
    pub fn new(
        config: StripeConfig,
        sessions: Arc<dyn SessionProvider>,
        site: SiteUrl,
        prediction: PredictionClient,
    ) -> Self {
        let stripe: Arc<dyn BillingProvider> = Arc::new(StripeClient::new(config));
        Self::with_provider(stripe, sessions, site, prediction)
    }

    /// Create a billing service on top of any billing provider
    pub fn with_provider(
        billing: Arc<dyn BillingProvider>,
        sessions: Arc<dyn SessionProvider>,
        site: SiteUrl,
        prediction: PredictionClient,
    ) -> Self {
        let customer = CustomerService::new(sessions, billing.clone());

        Self {
            checkout: CheckoutService::new(customer.clone(), billing.clone(), site.clone()),
            portal: PortalService::new(customer.clone(), billing.clone(), site),
            metered: MeteredBillingService::new(customer.clone(), billing, prediction),
            customer,
        }
    }
}
