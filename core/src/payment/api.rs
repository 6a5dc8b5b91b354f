// storefront/src/payment/api.rs

//! The two backend calls that bracket the hosted widget: creating the
//! gateway-side intent and verifying the widget's success tokens.

use crate::catalog::CustomerSnapshot;
use crate::error::ApiError;
use crate::http::ApiClient;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const CREATE_INTENT_PATH: &str = "/payment/create-order";
pub const VERIFY_PATH: &str = "/payment/verify";

/// Order details forwarded with the intent so the gateway record can be traced
/// back to a purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentMeta {
  pub product_id: String,
  pub quantity: u32,
  pub customer: CustomerSnapshot,
}

#[derive(Debug, Serialize)]
struct CreateIntentBody<'a> {
  /// Major units, as a JSON number.
  #[serde(with = "rust_decimal::serde::float")]
  amount: Decimal,
  currency: &'a str,
  meta: &'a IntentMeta,
}

/// A gateway-side order as created by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentIntent {
  pub id: String,
  /// Echoed in the gateway's unit; see [`crate::config::AmountUnit`].
  pub amount: Decimal,
  #[serde(default)]
  pub currency: Option<String>,
  #[serde(skip)]
  pub key_id: Option<String>,
}

/// The backend answers with the gateway order itself or wraps it with the key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IntentResponse {
  Wrapped {
    order: PaymentIntent,
    #[serde(default)]
    key_id: Option<String>,
  },
  Bare(PaymentIntent),
}

impl From<IntentResponse> for PaymentIntent {
  fn from(response: IntentResponse) -> Self {
    match response {
      IntentResponse::Wrapped { mut order, key_id } => {
        order.key_id = key_id;
        order
      }
      IntentResponse::Bare(order) => order,
    }
  }
}

/// The three values the widget hands back on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayTokens {
  #[serde(rename = "razorpay_order_id")]
  pub order_id: String,
  #[serde(rename = "razorpay_payment_id")]
  pub payment_id: String,
  #[serde(rename = "razorpay_signature")]
  pub signature: String,
}

#[derive(Debug, Clone)]
pub struct PaymentApi {
  api: ApiClient,
  verify_timeout: Duration,
}

impl PaymentApi {
  pub fn new(api: ApiClient, verify_timeout: Duration) -> Self {
    Self { api, verify_timeout }
  }

  #[instrument(name = "PaymentApi::create_intent", skip(self, meta), fields(product_id = %meta.product_id), err(Display))]
  pub async fn create_intent(&self, amount: Decimal, currency: &str, meta: &IntentMeta) -> Result<PaymentIntent, ApiError> {
    let body = CreateIntentBody { amount, currency, meta };
    let response: IntentResponse = self.api.post_json(CREATE_INTENT_PATH, &body).await?;
    let intent = PaymentIntent::from(response);
    info!(gateway_order_id = %intent.id, echoed_amount = %intent.amount, "payment intent created");
    Ok(intent)
  }

  /// Forwards the widget's tokens for server-side signature verification.
  ///
  /// Any 2xx counts as verified unless the body is JSON that explicitly says
  /// otherwise (`success: false` or `verified: false`), which yields
  /// `Ok(false)`. A non-JSON body is not a rejection. Any non-2xx is an `Err`.
  #[instrument(name = "PaymentApi::verify", skip_all, fields(gateway_order_id = %tokens.order_id), err(Display))]
  pub async fn verify(&self, tokens: &GatewayTokens) -> Result<bool, ApiError> {
    let body = self
      .api
      .post_text_with(VERIFY_PATH, tokens, self.verify_timeout, None)
      .await?;
    let verified = verification_accepted(&body);
    if !verified {
      warn!("backend rejected the payment signature");
    }
    Ok(verified)
  }
}

fn verification_accepted(body: &str) -> bool {
  match serde_json::from_str::<serde_json::Value>(body) {
    Ok(response) => ["success", "verified"]
      .iter()
      .all(|flag| response.get(flag).and_then(serde_json::Value::as_bool) != Some(false)),
    Err(_) => true,
  }
}
