//! Stripe client
//!
//! Wraps the `async-stripe` client and implements [`BillingProvider`] on top
//! of it.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stripe::{
    BillingPortalSession, CheckoutSession, CheckoutSessionBillingAddressCollection,
    CheckoutSessionMode, Client, CreateBillingPortalSession, CreateCheckoutSession,
    CreateCheckoutSessionCustomerUpdate, CreateCheckoutSessionCustomerUpdateAddress,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionSubscriptionData, CreateCustomer,
    CreateUsageRecord, Customer, CustomerId, ListCustomers, SubscriptionItemId, UsageRecord,
    UsageRecordAction,
};

use crate::checkout::{CheckoutMode, CheckoutParams};
use crate::error::{BillingError, BillingResult};
use crate::provider::{BillingProvider, SessionUser};

/// Customer metadata key linking a Stripe customer to an identity-provider user
pub const SUPABASE_UUID_KEY: &str = "supabaseUUID";

/// Stripe connection settings
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    /// Overrides the Stripe API base URL (e.g. a local stripe-mock)
    pub api_base: Option<String>,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> BillingResult<Self> {
        let secret_key = secret_key.into();
        if secret_key.trim().is_empty() {
            return Err(BillingError::Config("STRIPE_SECRET_KEY is empty".to_string()));
        }
        Ok(Self {
            secret_key,
            api_base: None,
        })
    }

    pub fn with_api_base(mut self, api_base: Option<String>) -> Self {
        self.api_base = api_base.filter(|base| !base.trim().is_empty());
        self
    }
}

/// Stripe API client
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        let client = match config.api_base {
            Some(api_base) => Client::from_url(api_base.as_str(), config.secret_key),
            None => Client::new(config.secret_key),
        };
        Self { client }
    }
}

/// Pick the customer to reuse among those sharing the user's email.
///
/// A customer tagged with the user's id wins, then the first untagged one.
/// Customers tagged with another user are never reused.
pub fn select_customer_id<'a, I>(candidates: I, user_id: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut untagged = None;
    for (customer_id, owner) in candidates {
        match owner.filter(|owner| !owner.is_empty()) {
            Some(owner) if owner == user_id => return Some(customer_id),
            Some(_) => {}
            None => {
                untagged.get_or_insert(customer_id);
            }
        }
    }
    untagged
}

#[derive(Debug, Serialize)]
struct UsageSummaryQuery {
    limit: u64,
}

#[derive(Debug, Deserialize)]
struct UsageSummaryPage {
    data: Vec<UsageSummaryRow>,
}

#[derive(Debug, Deserialize)]
struct UsageSummaryRow {
    total_usage: i64,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItemRef {
    subscription: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionOwner {
    customer: String,
}

fn parse_customer_id(customer_id: &str) -> BillingResult<CustomerId> {
    customer_id
        .parse::<CustomerId>()
        .map_err(|e| BillingError::StripeApi(format!("Invalid customer ID: {}", e)))
}

fn parse_subscription_item_id(item_id: &str) -> BillingResult<SubscriptionItemId> {
    item_id
        .parse::<SubscriptionItemId>()
        .map_err(|e| BillingError::StripeApi(format!("Invalid subscription item ID: {}", e)))
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn find_or_create_customer(&self, user: &SessionUser) -> BillingResult<String> {
        let email = user.email.as_deref().filter(|e| !e.is_empty());

        if let Some(email) = email {
            let mut params = ListCustomers::new();
            params.email = Some(email);
            let existing = Customer::list(&self.client, &params).await?;

            let candidates = existing.data.iter().map(|customer| {
                let owner = customer
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get(SUPABASE_UUID_KEY))
                    .map(String::as_str);
                (customer.id.as_str(), owner)
            });

            if let Some(customer_id) = select_customer_id(candidates, &user.id) {
                tracing::info!(
                    user_id = %user.id,
                    customer_id = %customer_id,
                    "Retrieved existing Stripe customer"
                );
                return Ok(customer_id.to_string());
            }
        }

        let mut metadata = HashMap::new();
        metadata.insert(SUPABASE_UUID_KEY.to_string(), user.id.clone());

        let params = CreateCustomer {
            email,
            metadata: Some(metadata),
            ..Default::default()
        };

        let customer = Customer::create(&self.client, params).await?;

        tracing::info!(
            user_id = %user.id,
            customer_id = %customer.id,
            "Created new Stripe customer"
        );

        Ok(customer.id.to_string())
    }

    async fn create_checkout_session(&self, params: &CheckoutParams) -> BillingResult<String> {
        let customer = parse_customer_id(&params.customer)?;

        let mut create = CreateCheckoutSession::new();
        create.allow_promotion_codes = Some(params.allow_promotion_codes);
        create.billing_address_collection = Some(if params.billing_address_required {
            CheckoutSessionBillingAddressCollection::Required
        } else {
            CheckoutSessionBillingAddressCollection::Auto
        });
        create.customer = Some(customer);
        if params.update_customer_address {
            create.customer_update = Some(CreateCheckoutSessionCustomerUpdate {
                address: Some(CreateCheckoutSessionCustomerUpdateAddress::Auto),
                ..Default::default()
            });
        }
        create.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(params.price_id.clone()),
            quantity: Some(params.quantity),
            ..Default::default()
        }]);
        create.cancel_url = Some(&params.cancel_url);
        create.success_url = Some(&params.success_url);

        match params.mode {
            CheckoutMode::Subscription { trial_end } => {
                create.mode = Some(CheckoutSessionMode::Subscription);
                create.subscription_data = Some(CreateCheckoutSessionSubscriptionData {
                    trial_end,
                    ..Default::default()
                });
            }
            CheckoutMode::Payment => {
                create.mode = Some(CheckoutSessionMode::Payment);
            }
        }

        let session = CheckoutSession::create(&self.client, create).await?;

        tracing::info!(
            customer_id = %params.customer,
            session_id = %session.id,
            "Created checkout session"
        );

        Ok(session.id.to_string())
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> BillingResult<String> {
        let customer = parse_customer_id(customer_id)?;

        let mut params = CreateBillingPortalSession::new(customer);
        params.return_url = Some(return_url);

        let session = BillingPortalSession::create(&self.client, params).await?;

        tracing::info!(customer_id = %customer_id, "Created billing portal session");

        Ok(session.url)
    }

    async fn subscription_item_customer(
        &self,
        subscription_item_id: &str,
    ) -> BillingResult<String> {
        let item_id = parse_subscription_item_id(subscription_item_id)?;

        let item: SubscriptionItemRef = self
            .client
            .get(&format!("/subscription_items/{}", item_id))
            .await?;
        let subscription: SubscriptionOwner = self
            .client
            .get(&format!("/subscriptions/{}", item.subscription))
            .await?;

        Ok(subscription.customer)
    }

    async fn usage_total(&self, subscription_item_id: &str) -> BillingResult<u64> {
        let item_id = parse_subscription_item_id(subscription_item_id)?;
        let path = format!("/subscription_items/{}/usage_record_summaries", item_id);

        let page: UsageSummaryPage = self
            .client
            .get_query(&path, &UsageSummaryQuery { limit: 1 })
            .await?;

        let total = page
            .data
            .first()
            .map(|row| row.total_usage.max(0) as u64)
            .unwrap_or(0);

        Ok(total)
    }

    async fn record_usage(
        &self,
        subscription_item_id: &str,
        quantity: u64,
        timestamp: i64,
    ) -> BillingResult<()> {
        let item_id = parse_subscription_item_id(subscription_item_id)?;

        let params = CreateUsageRecord {
            quantity,
            timestamp: Some(timestamp),
            action: Some(UsageRecordAction::Increment),
        };

        let record = UsageRecord::create(&self.client, &item_id, params).await?;

        tracing::info!(
            subscription_item_id = %subscription_item_id,
            usage_record_id = %record.id,
            quantity = quantity,
            "Reported usage increment"
        );

        Ok(())
    }
}
