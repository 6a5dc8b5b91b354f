// storefront/src/order/admin.rs

use super::ledger::{OrderEnvelope, OrderList};
use super::model::{Order, OrderStatus};
use crate::error::Result;
use crate::session::SessionContext;
use serde::Serialize;
use tracing::{info, instrument};

pub const ADMIN_ORDERS_PATH: &str = "/admin/orders";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdate<'a> {
  status: OrderStatus,
  increment_attempt: bool,
  note: &'a str,
}

/// Back-office order operations. The server enforces the role; this only
/// refuses early when the cached principal is not an admin.
#[derive(Debug, Clone)]
pub struct AdminOrders {
  session: SessionContext,
}

impl AdminOrders {
  pub fn new(session: SessionContext) -> Self {
    Self { session }
  }

  #[instrument(name = "AdminOrders::list", skip_all, err(Display))]
  pub async fn list(&self) -> Result<Vec<Order>> {
    self.session.require_admin()?;
    let list: OrderList = self.session.api().get_json(ADMIN_ORDERS_PATH).await?;
    Ok(list.into())
  }

  #[instrument(name = "AdminOrders::update_status", skip(self, note), err(Display))]
  pub async fn update_status(
    &self,
    order_id: &str,
    status: OrderStatus,
    increment_attempt: bool,
    note: Option<&str>,
  ) -> Result<Order> {
    self.session.require_admin()?;
    let body = StatusUpdate {
      status,
      increment_attempt,
      note: note.unwrap_or_default(),
    };
    let envelope: OrderEnvelope = self
      .session
      .api()
      .put_json(&format!("{ADMIN_ORDERS_PATH}/{order_id}/status"), &body)
      .await?;
    let order = Order::from(envelope);
    info!(order_id, status = %order.status, attempts = order.delivery_attempts, "order status updated");
    Ok(order)
  }
}
