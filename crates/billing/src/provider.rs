//! External collaborators of the billing flows
//!
//! The identity provider and the billing provider are only reached over
//! HTTP; these traits are the seams the services are written against.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::checkout::CheckoutParams;
use crate::error::BillingResult;

/// The authenticated user behind a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
}

/// Resolves the current user from the caller's access token
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_user(&self, access_token: &str) -> BillingResult<SessionUser>;
}

/// Operations the billing flows need from the payment provider
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Find the customer belonging to `user`, creating one if none exists.
    /// Returns the provider's customer id.
    async fn find_or_create_customer(&self, user: &SessionUser) -> BillingResult<String>;

    /// Create a hosted checkout session and return its id
    async fn create_checkout_session(&self, params: &CheckoutParams) -> BillingResult<String>;

    /// Create a billing portal session and return its URL
    async fn create_portal_session(&self, customer_id: &str, return_url: &str)
        -> BillingResult<String>;

    /// Customer id owning a subscription item
    async fn subscription_item_customer(&self, subscription_item_id: &str)
        -> BillingResult<String>;

    /// Usage accumulated on a metered subscription item in the current period
    async fn usage_total(&self, subscription_item_id: &str) -> BillingResult<u64>;

    /// Report `quantity` units as an increment on a metered subscription item
    async fn record_usage(
        &self,
        subscription_item_id: &str,
        quantity: u64,
        timestamp: i64,
    ) -> BillingResult<()>;
}
