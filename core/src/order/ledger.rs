// storefront/src/order/ledger.rs

use super::model::{CreateOrderRequest, Order};
use crate::error::ApiError;
use crate::http::ApiClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const CREATE_ORDER_PATH: &str = "/cart/create";
pub const MY_ORDERS_PATH: &str = "/cart/orders";

/// Order list responses come as `{ orders: [...] }` or as the bare array.
/// Entries are decoded one by one so a single malformed order cannot hide the rest.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OrderList {
  Wrapped {
    #[serde(default)]
    orders: Vec<serde_json::Value>,
  },
  Bare(Vec<serde_json::Value>),
}

impl From<OrderList> for Vec<Order> {
  fn from(list: OrderList) -> Self {
    let entries = match list {
      OrderList::Wrapped { orders } | OrderList::Bare(orders) => orders,
    };
    entries
      .into_iter()
      .filter_map(|entry| {
        let order_id = entry.get("_id").or_else(|| entry.get("id")).cloned();
        serde_json::from_value::<Order>(entry)
          .map_err(|e| warn!(order_id = ?order_id, error = %e, "skipping unreadable order"))
          .ok()
      })
      .collect()
  }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OrderEnvelope {
  Wrapped { order: Order },
  Bare(Order),
}

impl From<OrderEnvelope> for Order {
  fn from(envelope: OrderEnvelope) -> Self {
    match envelope {
      OrderEnvelope::Wrapped { order } | OrderEnvelope::Bare(order) => order,
    }
  }
}

/// The buyer's side of the order store.
#[derive(Debug, Clone)]
pub struct OrderLedger {
  api: ApiClient,
  order_timeout: Duration,
}

impl OrderLedger {
  pub fn new(api: ApiClient, order_timeout: Duration) -> Self {
    Self { api, order_timeout }
  }

  /// Issues exactly one order-creation request. Never retried here.
  ///
  /// A 2xx means the order exists. The returned record is `None` when the
  /// backend acknowledged without echoing something that reads as an order.
  #[instrument(
    name = "OrderLedger::create",
    skip_all,
    fields(product_id = %request.product_id, quantity = request.quantity, idempotency_key = %idempotency_key),
    err(Display)
  )]
  pub async fn create(&self, request: &CreateOrderRequest, idempotency_key: &str) -> Result<Option<Order>, ApiError> {
    let body = self
      .api
      .post_text_with(CREATE_ORDER_PATH, request, self.order_timeout, Some(idempotency_key))
      .await?;
    let order = serde_json::from_str::<OrderEnvelope>(&body)
      .map(Order::from)
      .map_err(|e| debug!(error = %e, "order creation acknowledged without a readable order"))
      .ok();
    info!(order_id = order.as_ref().map(|o| o.order_id.as_str()), "order recorded");
    Ok(order)
  }

  /// The caller's orders, newest state from the server. Any failure reads as
  /// an empty list.
  #[instrument(name = "OrderLedger::list_mine", skip_all)]
  pub async fn list_mine(&self) -> Vec<Order> {
    match self.api.get_json::<OrderList>(MY_ORDERS_PATH).await {
      Ok(list) => list.into(),
      Err(e) => {
        warn!(error = %e, "could not load orders, showing none");
        Vec::new()
      }
    }
  }

  /// Tells the backend the buyer has seen the admin-set delivery date.
  /// Best-effort; returns whether the backend accepted it.
  #[instrument(name = "OrderLedger::acknowledge_eta", skip(self))]
  pub async fn acknowledge_eta(&self, order_id: &str) -> bool {
    let path = format!("{MY_ORDERS_PATH}/{order_id}/ack-eta");
    match self.api.put_json::<_, serde_json::Value>(&path, &serde_json::json!({})).await {
      Ok(_) => true,
      Err(e) => {
        warn!(error = %e, "eta acknowledgement failed");
        false
      }
    }
  }
}
