//! Checkout sessions
//!
//! Builds the hosted checkout for a price and reports the outcome as a
//! session id or an error redirect. Nothing here returns an error to the
//! caller.

use std::sync::Arc;

use flowdesk_shared::{error_redirect, SiteUrl};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::customer::CustomerService;
use crate::error::{BillingError, BillingResult, TRY_AGAIN_HINT};
use crate::price::{Price, PriceType};
use crate::provider::BillingProvider;

/// Where the user lands after checkout when the caller gives no path
pub const DEFAULT_REDIRECT_PATH: &str = "/account";

/// Trials shorter than this are dropped (Stripe requires at least 48 hours)
pub const MIN_TRIAL_DAYS: i64 = 2;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Billing mode of a checkout session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Subscription { trial_end: Option<i64> },
    Payment,
}

/// Parameters of a checkout session, independent of the Stripe SDK types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutParams {
    pub customer: String,
    pub price_id: String,
    pub quantity: u64,
    pub allow_promotion_codes: bool,
    pub billing_address_required: bool,
    /// Let checkout write the collected address back to the customer
    pub update_customer_address: bool,
    pub cancel_url: String,
    pub success_url: String,
    pub mode: CheckoutMode,
}

/// Outcome of a checkout attempt, as returned to the frontend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_redirect: Option<String>,
}

impl CheckoutResponse {
    pub fn session(session_id: String) -> Self {
        Self {
            session_id: Some(session_id),
            error_redirect: None,
        }
    }

    pub fn redirect(error_redirect: String) -> Self {
        Self {
            session_id: None,
            error_redirect: Some(error_redirect),
        }
    }
}

/// Unix timestamp at which a trial of `trial_period_days` ends, counted from
/// `now`. One extra day is added so the trial covers the full period.
pub fn calculate_trial_end(trial_period_days: Option<i64>, now: OffsetDateTime) -> Option<i64> {
    let days = trial_period_days.filter(|days| *days >= MIN_TRIAL_DAYS)?;
    Some(now.unix_timestamp() + (days + 1) * SECONDS_PER_DAY)
}

/// Build the checkout parameters for `price`
pub fn build_checkout_params(
    price: &Price,
    customer_id: &str,
    site: &SiteUrl,
    redirect_path: &str,
    now: OffsetDateTime,
) -> BillingResult<CheckoutParams> {
    let mode = match &price.price_type {
        Some(PriceType::Recurring) => CheckoutMode::Subscription {
            trial_end: calculate_trial_end(price.trial_period_days, now),
        },
        Some(PriceType::OneTime) => CheckoutMode::Payment,
        Some(PriceType::Other(other)) => {
            return Err(BillingError::UnsupportedPriceType(other.clone()))
        }
        None => return Err(BillingError::UnsupportedPriceType("none".to_string())),
    };

    Ok(CheckoutParams {
        customer: customer_id.to_string(),
        price_id: price.id.clone(),
        quantity: 1,
        allow_promotion_codes: true,
        billing_address_required: true,
        update_customer_address: true,
        cancel_url: site.url(""),
        success_url: site.url(redirect_path),
        mode,
    })
}

#[derive(Clone)]
pub struct CheckoutService {
    customers: CustomerService,
    billing: Arc<dyn BillingProvider>,
    site: SiteUrl,
}

impl CheckoutService {
    pub fn new(customers: CustomerService, billing: Arc<dyn BillingProvider>, site: SiteUrl) -> Self {
        Self {
            customers,
            billing,
            site,
        }
    }

    /// Start a checkout for `price` on behalf of the user owning
    /// `access_token`. Failures come back as an error redirect to
    /// `redirect_path` (default [`DEFAULT_REDIRECT_PATH`]).
    pub async fn checkout_with_stripe(
        &self,
        access_token: Option<&str>,
        price: &Price,
        redirect_path: Option<&str>,
    ) -> CheckoutResponse {
        let redirect_path = redirect_path
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_REDIRECT_PATH);

        match self.try_checkout(access_token, price, redirect_path).await {
            Ok(session_id) => CheckoutResponse::session(session_id),
            Err(e) => {
                tracing::error!(price_id = %price.id, error = %e, "Checkout failed");
                CheckoutResponse::redirect(error_redirect(
                    redirect_path,
                    &e.redirect_title(),
                    TRY_AGAIN_HINT,
                ))
            }
        }
    }

    async fn try_checkout(
        &self,
        access_token: Option<&str>,
        price: &Price,
        redirect_path: &str,
    ) -> BillingResult<String> {
        let resolved = self.customers.resolve(access_token).await?;

        let params = build_checkout_params(
            price,
            &resolved.customer_id,
            &self.site,
            redirect_path,
            OffsetDateTime::now_utc(),
        )?;

        tracing::debug!(
            user_id = %resolved.user.id,
            price_id = %price.id,
            mode = ?params.mode,
            "Creating checkout session"
        );

        let session_id = self
            .billing
            .create_checkout_session(&params)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Stripe rejected checkout session");
                BillingError::CheckoutSession
            })?;

        if session_id.is_empty() {
            return Err(BillingError::CheckoutSession);
        }

        Ok(session_id)
    }
}
