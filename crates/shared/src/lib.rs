#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Flowdesk Shared
//!
//! Pieces used by both the API server and the billing crate:
//!
//! - **Prediction client**: authenticated calls to the hosted chat flow
//! - **Site URLs**: absolute URLs on the public site and toast redirects

pub mod prediction;
pub mod urls;

pub use prediction::{PredictionClient, PredictionError, DEFAULT_PREDICTION_URL};
pub use urls::{error_redirect, SiteUrl, DEFAULT_SITE_URL};
