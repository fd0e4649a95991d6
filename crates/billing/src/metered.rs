//! Metered usage for chat questions
//!
//! Only the owner of a subscription item may charge it: the caller is
//! resolved from their access token and the item's customer must match.
//! A question is charged by its character count before it is forwarded,
//! and the streamed answer is charged the same way once it has been read in
//! full. Both are reported as `increment` usage records on the caller's
//! metered subscription item.

use std::sync::Arc;

use flowdesk_shared::PredictionClient;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;

use crate::customer::CustomerService;
use crate::error::{BillingError, BillingResult};
use crate::provider::BillingProvider;

/// Characters a subscription item may consume per period unless the caller
/// says otherwise
pub const DEFAULT_USAGE_THRESHOLD: u64 = 10_000;

/// Outcome of a metered question, as returned to the frontend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_redirect: Option<String>,
}

impl UsageResponse {
    pub fn answered(response: String) -> Self {
        Self {
            response: Some(response),
            error_redirect: None,
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            response: None,
            error_redirect: Some(message),
        }
    }
}

/// Collects the answer text from a prediction response body.
///
/// Streaming responses arrive as server-sent events; every `data:` line
/// holding `{"event":"token","data":"..."}` contributes its text. A
/// non-streaming response is a single JSON document whose `text` field is
/// the answer.
#[derive(Debug, Default)]
pub struct AnswerAccumulator {
    pending: Vec<u8>,
    /// Raw body, kept only until the first `data:` line shows the response
    /// is an event stream
    body: Vec<u8>,
    streaming: bool,
    text: String,
}

impl AnswerAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the body
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume_line(&String::from_utf8_lossy(&line));
        }

        if self.streaming {
            self.body = Vec::new();
        } else {
            self.body.extend_from_slice(chunk);
        }
    }

    /// Answer text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Flush any unterminated line and return the answer
    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.consume_line(&String::from_utf8_lossy(&line));
        }

        if !self.streaming && self.text.is_empty() {
            if let Ok(Value::Object(document)) = serde_json::from_slice::<Value>(&self.body) {
                if let Some(text) = document.get("text").and_then(Value::as_str) {
                    return text.to_string();
                }
            }
        }

        self.text
    }

    fn consume_line(&mut self, line: &str) {
        let Some(payload) = line.trim().strip_prefix("data:") else {
            return;
        };
        self.streaming = true;

        let Ok(event) = serde_json::from_str::<Value>(payload.trim()) else {
            return;
        };

        if event.get("event").and_then(Value::as_str) == Some("token") {
            if let Some(token) = event.get("data").and_then(Value::as_str) {
                self.text.push_str(token);
            }
        }
    }
}

/// Number of characters charged for `text`
pub fn char_count(text: &str) -> u64 {
    text.chars().count() as u64
}

#[derive(Clone)]
pub struct MeteredBillingService {
    customers: CustomerService,
    billing: Arc<dyn BillingProvider>,
    prediction: PredictionClient,
}

impl MeteredBillingService {
    pub fn new(
        customers: CustomerService,
        billing: Arc<dyn BillingProvider>,
        prediction: PredictionClient,
    ) -> Self {
        Self {
            customers,
            billing,
            prediction,
        }
    }

    /// Charge, forward and answer a question. Failures come back as an
    /// `errorRedirect` message rather than an error.
    pub async fn process_usage_record(
        &self,
        access_token: Option<&str>,
        question: &str,
        subscription_item_id: &str,
        usage_threshold: Option<u64>,
    ) -> UsageResponse {
        let threshold = usage_threshold.unwrap_or(DEFAULT_USAGE_THRESHOLD);

        match self
            .try_process(access_token, question, subscription_item_id, threshold)
            .await
        {
            Ok(answer) => UsageResponse::answered(answer),
            Err(e) => {
                tracing::error!(
                    subscription_item_id = %subscription_item_id,
                    error = %e,
                    "Error handling metered question"
                );
                UsageResponse::failed(e.usage_message())
            }
        }
    }

    async fn try_process(
        &self,
        access_token: Option<&str>,
        question: &str,
        subscription_item_id: &str,
        threshold: u64,
    ) -> BillingResult<String> {
        self.authorize(access_token, subscription_item_id).await?;

        let requested = char_count(question);
        let used = self.billing.usage_total(subscription_item_id).await?;

        if used.saturating_add(requested) > threshold {
            return Err(BillingError::QuotaExceeded {
                used,
                requested,
                threshold,
            });
        }

        self.billing
            .record_usage(
                subscription_item_id,
                requested,
                OffsetDateTime::now_utc().unix_timestamp(),
            )
            .await?;

        let answer = self.ask(question).await?;
        let answered = char_count(&answer);

        self.billing
            .record_usage(
                subscription_item_id,
                answered,
                OffsetDateTime::now_utc().unix_timestamp(),
            )
            .await?;

        tracing::info!(
            subscription_item_id = %subscription_item_id,
            question_chars = requested,
            answer_chars = answered,
            "Metered question answered"
        );

        Ok(answer)
    }

    /// Fails unless the caller's customer owns `subscription_item_id`
    async fn authorize(
        &self,
        access_token: Option<&str>,
        subscription_item_id: &str,
    ) -> BillingResult<()> {
        let resolved = self.customers.resolve(access_token).await?;
        let owner = self
            .billing
            .subscription_item_customer(subscription_item_id)
            .await?;

        if owner != resolved.customer_id {
            tracing::warn!(
                user_id = %resolved.user.id,
                customer_id = %resolved.customer_id,
                subscription_item_id = %subscription_item_id,
                "Subscription item belongs to another customer"
            );
            return Err(BillingError::ForeignSubscriptionItem);
        }

        Ok(())
    }

    async fn ask(&self, question: &str) -> BillingResult<String> {
        let response = self
            .prediction
            .predict(&json!({ "question": question, "streaming": true }))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BillingError::Upstream(format!(
                "prediction endpoint returned {}",
                status
            )));
        }

        let mut accumulator = AnswerAccumulator::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            accumulator.push(&chunk?);
        }

        Ok(accumulator.finish())
    }
}
