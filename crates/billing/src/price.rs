//! Price catalogue rows as sent by the frontend

use serde::{Deserialize, Serialize};

/// How a price is billed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PriceType {
    OneTime,
    Recurring,
    /// Any value the checkout flow has no mode for
    Other(String),
}

impl PriceType {
    pub fn as_str(&self) -> &str {
        match self {
            PriceType::OneTime => "one_time",
            PriceType::Recurring => "recurring",
            PriceType::Other(value) => value,
        }
    }
}

impl From<String> for PriceType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "one_time" => PriceType::OneTime,
            "recurring" => PriceType::Recurring,
            _ => PriceType::Other(value),
        }
    }
}

impl From<PriceType> for String {
    fn from(value: PriceType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for PriceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A price the user can check out with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Stripe price id (`price_...`)
    pub id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(rename = "type", default)]
    pub price_type: Option<PriceType>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub interval_count: Option<i64>,
    #[serde(default)]
    pub trial_period_days: Option<i64>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl Price {
    /// Minimal price with only an id and a billing type
    pub fn new(id: impl Into<String>, price_type: PriceType) -> Self {
        Self {
            id: id.into(),
            product_id: None,
            active: None,
            description: None,
            unit_amount: None,
            currency: None,
            price_type: Some(price_type),
            interval: None,
            interval_count: None,
            trial_period_days: None,
            metadata: None,
        }
    }

    pub fn with_trial_days(mut self, days: i64) -> Self {
        self.trial_period_days = Some(days);
        self
    }
}
