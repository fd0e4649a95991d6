//! Billing endpoints
//!
//! Thin HTTP wrappers over the billing flows. The flows never fail: their
//! outcome (session id, URL or error redirect) is always returned with 200.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use flowdesk_billing::{CheckoutResponse, PortalResponse, Price, UsageResponse};
use serde::Deserialize;

use crate::auth::AccessToken;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub price: Price,
    #[serde(default)]
    pub redirect_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalRequest {
    pub current_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRequest {
    pub question: String,
    pub subscription_item_id: String,
    #[serde(default)]
    pub usage_threshold: Option<u64>,
}

/// Handle `POST /api/billing/checkout`
pub async fn create_checkout(
    State(state): State<AppState>,
    AccessToken(token): AccessToken,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<Json<CheckoutResponse>> {
    let billing = state
        .billing_service()
        .ok_or(ApiError::BillingUnavailable)?;
    let Json(request) = payload?;

    let response = billing
        .checkout
        .checkout_with_stripe(
            token.as_deref(),
            &request.price,
            request.redirect_path.as_deref(),
        )
        .await;

    Ok(Json(response))
}

/// Handle `POST /api/billing/portal`
pub async fn create_portal(
    State(state): State<AppState>,
    AccessToken(token): AccessToken,
    payload: Result<Json<PortalRequest>, JsonRejection>,
) -> ApiResult<Json<PortalResponse>> {
    let billing = state
        .billing_service()
        .ok_or(ApiError::BillingUnavailable)?;
    let Json(request) = payload?;

    let response = billing
        .portal
        .create_stripe_portal(token.as_deref(), &request.current_path)
        .await;

    Ok(Json(response))
}

/// Handle `POST /api/billing/usage`
///
/// The caller must own the subscription item they are charging.
pub async fn process_usage(
    State(state): State<AppState>,
    AccessToken(token): AccessToken,
    payload: Result<Json<UsageRequest>, JsonRejection>,
) -> ApiResult<Json<UsageResponse>> {
    let billing = state
        .billing_service()
        .ok_or(ApiError::BillingUnavailable)?;
    let Json(request) = payload?;

    if request.question.is_empty() {
        return Err(ApiError::InvalidQuestion);
    }

    let response = billing
        .metered
        .process_usage_record(
            token.as_deref(),
            &request.question,
            &request.subscription_item_id,
            request.usage_threshold,
        )
        .await;

    Ok(Json(response))
}
