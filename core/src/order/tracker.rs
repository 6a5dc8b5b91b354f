// storefront/src/order/tracker.rs

//! Re-fetches the buyer's orders and surfaces admin-set delivery dates once.

use super::ledger::OrderLedger;
use super::model::Order;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtaNotice {
  pub order_id: String,
  pub expected_delivery_date: Option<DateTime<Utc>>,
  /// Whether the backend accepted the acknowledgement.
  pub acknowledged: bool,
}

impl EtaNotice {
  pub fn message(&self) -> String {
    match self.expected_delivery_date {
      Some(date) => format!("Your product delivery confirmed on {}", date.format("%d/%m/%Y")),
      None => "Your delivery date has been set by admin.".to_string(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct OrderSnapshot {
  pub orders: Vec<Order>,
  pub notices: Vec<EtaNotice>,
}

#[derive(Debug, Clone)]
pub struct OrderTracker {
  ledger: OrderLedger,
}

impl OrderTracker {
  pub fn new(ledger: OrderLedger) -> Self {
    Self { ledger }
  }

  /// One refresh: fetch, then acknowledge each unseen ETA.
  #[instrument(name = "OrderTracker::poll_once", skip_all)]
  pub async fn poll_once(&self) -> OrderSnapshot {
    let orders = self.ledger.list_mine().await;
    let mut notices = Vec::new();
    for order in orders.iter().filter(|o| o.has_unacknowledged_eta()) {
      let acknowledged = self.ledger.acknowledge_eta(&order.order_id).await;
      notices.push(EtaNotice {
        order_id: order.order_id.clone(),
        expected_delivery_date: order.expected_delivery_date,
        acknowledged,
      });
    }
    debug!(orders = orders.len(), notices = notices.len(), "orders refreshed");
    OrderSnapshot { orders, notices }
  }

  /// Polls every `period` and forwards each snapshot. Ends when the receiver
  /// is dropped.
  pub fn spawn(self, period: Duration) -> (mpsc::Receiver<OrderSnapshot>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        tokio::select! {
          _ = tx.closed() => break,
          _ = ticker.tick() => {
            let snapshot = self.poll_once().await;
            if tx.send(snapshot).await.is_err() {
              break;
            }
          }
        }
      }
      info!("order tracker stopped");
    });
    (rx, handle)
  }
}
