// storefront/src/order/model.rs

//! Server-persisted orders as the backend returns them.

use crate::catalog::CustomerSnapshot;
use crate::payment::GatewayTokens;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
  #[default]
  Pending,
  Paid,
  Shipped,
  OutForDelivery,
  Delivered,
  Failed,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::Paid,
    OrderStatus::Shipped,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
    OrderStatus::Failed,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Paid => "paid",
      OrderStatus::Shipped => "shipped",
      OrderStatus::OutForDelivery => "out-for-delivery",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Failed => "failed",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// `productId` is a bare id on some endpoints and a populated product on others.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
  Id(String),
  Summary {
    #[serde(alias = "_id")]
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    images: Vec<String>,
  },
}

impl ProductRef {
  pub fn id(&self) -> &str {
    match self {
      ProductRef::Id(id) | ProductRef::Summary { id, .. } => id,
    }
  }

  pub fn title(&self) -> Option<&str> {
    match self {
      ProductRef::Id(_) => None,
      ProductRef::Summary { title, .. } => title.as_deref(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeliveryLog {
  pub status: OrderStatus,
  #[serde(default)]
  pub note: Option<String>,
  #[serde(default, alias = "at", alias = "date")]
  pub timestamp: Option<DateTime<Utc>>,
}

/// The payment reference stored on an order. Fields are optional because
/// admin listings may strip the signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PaymentReference {
  #[serde(default, rename = "razorpay_order_id")]
  pub gateway_order_id: Option<String>,
  #[serde(default, rename = "razorpay_payment_id")]
  pub gateway_payment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  #[serde(rename = "_id", alias = "id")]
  pub order_id: String,
  #[serde(default, rename = "productId")]
  pub product: Option<ProductRef>,
  #[serde(default)]
  pub quantity: u32,
  #[serde(default)]
  pub total: Decimal,
  #[serde(default)]
  pub customer: Option<CustomerSnapshot>,
  #[serde(default)]
  pub payment: Option<PaymentReference>,
  #[serde(default)]
  pub status: OrderStatus,
  #[serde(default)]
  pub expected_delivery_date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub delivery_logs: Vec<DeliveryLog>,
  #[serde(default)]
  pub delivery_attempts: u32,
  #[serde(default)]
  pub admin_set_eta: bool,
  #[serde(default)]
  pub eta_notified: bool,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl Order {
  /// An admin-set delivery date the buyer has not been told about yet.
  pub fn has_unacknowledged_eta(&self) -> bool {
    self.admin_set_eta && !self.eta_notified
  }
}

/// Body of `POST /cart/create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
  pub product_id: String,
  pub quantity: u32,
  pub customer: CustomerSnapshot,
  #[serde(with = "rust_decimal::serde::float")]
  pub total: Decimal,
  pub payment: GatewayTokens,
}
