//! Customer resolution shared by the checkout and portal flows

use std::sync::Arc;

use crate::error::{BillingError, BillingResult};
use crate::provider::{BillingProvider, SessionProvider, SessionUser};

/// The signed-in user together with their billing customer id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCustomer {
    pub user: SessionUser,
    pub customer_id: String,
}

#[derive(Clone)]
pub struct CustomerService {
    sessions: Arc<dyn SessionProvider>,
    billing: Arc<dyn BillingProvider>,
}

impl CustomerService {
    pub fn new(sessions: Arc<dyn SessionProvider>, billing: Arc<dyn BillingProvider>) -> Self {
        Self { sessions, billing }
    }

    /// Resolve the current user, then their customer record.
    ///
    /// Errors are narrowed to [`BillingError::Session`] and
    /// [`BillingError::CustomerRecord`]; the underlying cause is only logged.
    pub async fn resolve(&self, access_token: Option<&str>) -> BillingResult<ResolvedCustomer> {
        let token = access_token
            .filter(|t| !t.is_empty())
            .ok_or(BillingError::Session)?;

        let user = self.sessions.current_user(token).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to resolve user session");
            BillingError::Session
        })?;

        let customer_id = self
            .billing
            .find_or_create_customer(&user)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Failed to resolve customer record");
                BillingError::CustomerRecord
            })?;

        if customer_id.is_empty() {
            return Err(BillingError::CustomerRecord);
        }

        Ok(ResolvedCustomer { user, customer_id })
    }
}
