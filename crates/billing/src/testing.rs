//! In-memory collaborators for tests

use std::sync::Mutex;

use async_trait::async_trait;

use crate::checkout::CheckoutParams;
use crate::error::{BillingError, BillingResult};
use crate::provider::{BillingProvider, SessionProvider, SessionUser};

pub(crate) struct FakeSessions {
    user: Option<SessionUser>,
}

impl FakeSessions {
    pub(crate) fn signed_in() -> Self {
        Self {
            user: Some(SessionUser {
                id: "user-1".to_string(),
                email: Some("user@example.com".to_string()),
            }),
        }
    }

    pub(crate) fn signed_out() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl SessionProvider for FakeSessions {
    async fn current_user(&self, _access_token: &str) -> BillingResult<SessionUser> {
        self.user
            .clone()
            .ok_or_else(|| BillingError::Upstream("no user for token".to_string()))
    }
}

#[derive(Default)]
pub(crate) struct FakeBilling {
    pub fail_customer: bool,
    pub fail_checkout: bool,
    pub fail_portal: bool,
    pub usage_total: u64,
    /// Owner reported for every subscription item (`cus_user-1` when unset)
    pub item_customer: Option<String>,
    pub(crate) customer_lookups: Mutex<u32>,
    pub(crate) checkouts: Mutex<Vec<CheckoutParams>>,
    pub(crate) portal_return_urls: Mutex<Vec<String>>,
    pub(crate) usage_records: Mutex<Vec<(String, u64, i64)>>,
}

impl FakeBilling {
    pub(crate) fn customer_lookups(&self) -> u32 {
        *self.customer_lookups.lock().unwrap()
    }

    pub(crate) fn checkouts(&self) -> Vec<CheckoutParams> {
        self.checkouts.lock().unwrap().clone()
    }

    pub(crate) fn portal_return_urls(&self) -> Vec<String> {
        self.portal_return_urls.lock().unwrap().clone()
    }

    pub(crate) fn usage_records(&self) -> Vec<(String, u64, i64)> {
        self.usage_records.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingProvider for FakeBilling {
    async fn find_or_create_customer(&self, user: &SessionUser) -> BillingResult<String> {
        *self.customer_lookups.lock().unwrap() += 1;
        if self.fail_customer {
            return Err(BillingError::StripeApi("customer lookup failed".to_string()));
        }
        Ok(format!("cus_{}", user.id))
    }

    async fn create_checkout_session(&self, params: &CheckoutParams) -> BillingResult<String> {
        if self.fail_checkout {
            return Err(BillingError::StripeApi("checkout rejected".to_string()));
        }
        self.checkouts.lock().unwrap().push(params.clone());
        Ok("cs_test_123".to_string())
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> BillingResult<String> {
        if self.fail_portal {
            return Err(BillingError::StripeApi("portal rejected".to_string()));
        }
        self.portal_return_urls
            .lock()
            .unwrap()
            .push(return_url.to_string());
        Ok(format!("https://billing.example.com/p/{}", customer_id))
    }

    async fn subscription_item_customer(
        &self,
        _subscription_item_id: &str,
    ) -> BillingResult<String> {
        Ok(self
            .item_customer
            .clone()
            .unwrap_or_else(|| "cus_user-1".to_string()))
    }

    async fn usage_total(&self, _subscription_item_id: &str) -> BillingResult<u64> {
        Ok(self.usage_total)
    }

    async fn record_usage(
        &self,
        subscription_item_id: &str,
        quantity: u64,
        timestamp: i64,
    ) -> BillingResult<()> {
        self.usage_records
            .lock()
            .unwrap()
            .push((subscription_item_id.to_string(), quantity, timestamp));
        Ok(())
    }
}
