//! Billing portal sessions

use std::sync::Arc;

use flowdesk_shared::{error_redirect, SiteUrl};
use serde::{Deserialize, Serialize};

use crate::customer::CustomerService;
use crate::error::{BillingError, BillingResult, TRY_AGAIN_HINT};
use crate::provider::BillingProvider;

/// Page the portal sends the user back to
pub const PORTAL_RETURN_PATH: &str = "/account";

/// Response body of the portal route: either the portal URL or an error redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalResponse {
    pub url: String,
}

#[derive(Clone)]
pub struct PortalService {
    customers: CustomerService,
    billing: Arc<dyn BillingProvider>,
    site: SiteUrl,
}

impl PortalService {
    pub fn new(customers: CustomerService, billing: Arc<dyn BillingProvider>, site: SiteUrl) -> Self {
        Self {
            customers,
            billing,
            site,
        }
    }

    /// URL of a billing portal session for the signed-in user, or an error
    /// redirect back to `current_path`.
    pub async fn create_stripe_portal(
        &self,
        access_token: Option<&str>,
        current_path: &str,
    ) -> PortalResponse {
        let url = match self.try_create_portal(access_token).await {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "Billing portal creation failed");
                error_redirect(current_path, &e.redirect_title(), TRY_AGAIN_HINT)
            }
        };

        PortalResponse { url }
    }

    async fn try_create_portal(&self, access_token: Option<&str>) -> BillingResult<String> {
        let resolved = self.customers.resolve(access_token).await?;
        let return_url = self.site.url(PORTAL_RETURN_PATH);

        let url = self
            .billing
            .create_portal_session(&resolved.customer_id, &return_url)
            .await
            .map_err(|e| {
                tracing::error!(customer_id = %resolved.customer_id, error = %e, "Stripe rejected portal session");
                BillingError::PortalSession
            })?;

        if url.is_empty() {
            return Err(BillingError::PortalSession);
        }

        Ok(url)
    }
}
