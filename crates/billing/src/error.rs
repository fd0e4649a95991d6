//! Billing error types

use thiserror::Error;

/// Title shown to the user for failures that carry no user-facing message
pub const UNKNOWN_ERROR_TITLE: &str = "An unknown error occurred.";

/// Description attached to every billing error redirect
pub const TRY_AGAIN_HINT: &str = "Please try again later or contact a system administrator.";

/// Message returned by the usage flow for anything but an exhausted quota
pub const USAGE_INTERNAL_ERROR: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Could not get user session.")]
    Session,

    #[error("Unable to access customer record.")]
    CustomerRecord,

    #[error("Unable to create checkout session.")]
    CheckoutSession,

    #[error("Could not create billing portal")]
    PortalSession,

    #[error("Unsupported price type: {0}")]
    UnsupportedPriceType(String),

    #[error("Subscription item does not belong to this customer.")]
    ForeignSubscriptionItem,

    #[error("Usage quota exhausted.")]
    QuotaExceeded {
        used: u64,
        requested: u64,
        threshold: u64,
    },

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Stripe API error: {0}")]
    StripeApi(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Title used in error redirects. Failures of a known step keep their
    /// message, anything unclassified collapses to [`UNKNOWN_ERROR_TITLE`].
    pub fn redirect_title(&self) -> String {
        match self {
            BillingError::Upstream(_)
            | BillingError::StripeApi(_)
            | BillingError::Config(_)
            | BillingError::Internal(_) => UNKNOWN_ERROR_TITLE.to_string(),
            known => known.to_string(),
        }
    }

    /// Message returned to callers of the usage flow
    pub fn usage_message(&self) -> String {
        match self {
            BillingError::QuotaExceeded { .. }
            | BillingError::Session
            | BillingError::CustomerRecord
            | BillingError::ForeignSubscriptionItem => self.to_string(),
            _ => USAGE_INTERNAL_ERROR.to_string(),
        }
    }
}

impl From<stripe::StripeError> for BillingError {
    fn from(err: stripe::StripeError) -> Self {
        BillingError::StripeApi(err.to_string())
    }
}

impl From<flowdesk_shared::PredictionError> for BillingError {
    fn from(err: flowdesk_shared::PredictionError) -> Self {
        match err {
            flowdesk_shared::PredictionError::MissingApiKey => {
                BillingError::Config("prediction API key not configured".to_string())
            }
            other => BillingError::Upstream(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for BillingError {
    fn from(err: reqwest::Error) -> Self {
        BillingError::Upstream(err.to_string())
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
