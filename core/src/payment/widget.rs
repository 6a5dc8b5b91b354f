// storefront/src/payment/widget.rs

//! The hosted checkout widget seam.
//!
//! The widget is external: a lazily loaded script that, once opened, reports
//! back exactly once. [`WidgetCallbacks`] is that report channel. It settles at
//! most once, and a widget that goes away without settling it (the user closed
//! the popup) resolves to [`WidgetOutcome::Dismissed`].

use super::api::GatewayTokens;
use crate::catalog::CustomerSnapshot;
use crate::error::{Result, StorefrontError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// The checkout script could not be loaded: blocked by the browser or an
/// extension, or unreachable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("checkout widget unavailable: {0}")]
pub struct WidgetUnavailable(pub String);

/// What the widget is opened with. Amount and order id come from the
/// server-created intent, never from a client-side recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetRequest {
  pub key: String,
  pub gateway_order_id: String,
  pub amount: Decimal,
  pub currency: String,
  pub merchant_name: String,
  pub description: String,
  pub prefill: CustomerSnapshot,
}

/// Error payload of the widget's failure callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayFailure {
  pub code: Option<String>,
  pub description: String,
}

impl GatewayFailure {
  pub fn new(description: impl Into<String>) -> Self {
    Self {
      code: None,
      description: description.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetOutcome {
  Succeeded(GatewayTokens),
  Failed(GatewayFailure),
  /// Closed without either callback firing.
  Dismissed,
}

/// The continuation a widget settles. Cheap to clone; all clones share one slot.
#[derive(Debug, Clone)]
pub struct WidgetCallbacks {
  slot: Arc<Mutex<Option<oneshot::Sender<WidgetOutcome>>>>,
}

impl WidgetCallbacks {
  /// Creates a fresh continuation and the receiver the flow awaits.
  ///
  /// When the last clone is dropped unsettled the receiver sees a closed
  /// channel, which [`WidgetCallbacks::outcome`] maps to `Dismissed`.
  pub fn channel() -> (Self, oneshot::Receiver<WidgetOutcome>) {
    let (tx, rx) = oneshot::channel();
    (
      Self {
        slot: Arc::new(Mutex::new(Some(tx))),
      },
      rx,
    )
  }

  pub async fn outcome(rx: oneshot::Receiver<WidgetOutcome>) -> WidgetOutcome {
    rx.await.unwrap_or(WidgetOutcome::Dismissed)
  }

  /// Returns `false` if the continuation was already settled.
  pub fn succeed(&self, tokens: GatewayTokens) -> bool {
    self.settle(WidgetOutcome::Succeeded(tokens))
  }

  pub fn fail(&self, failure: GatewayFailure) -> bool {
    self.settle(WidgetOutcome::Failed(failure))
  }

  pub fn dismiss(&self) -> bool {
    self.settle(WidgetOutcome::Dismissed)
  }

  pub fn is_settled(&self) -> bool {
    self.slot.lock().is_none()
  }

  fn settle(&self, outcome: WidgetOutcome) -> bool {
    let sender = self.slot.lock().take();
    match sender {
      Some(tx) => {
        debug!(?outcome, "widget callback settled");
        // A closed receiver means the flow already gave up on this attempt.
        tx.send(outcome).is_ok()
      }
      None => {
        warn!(?outcome, "widget callback fired after settlement, ignoring");
        false
      }
    }
  }
}

#[async_trait]
pub trait CheckoutWidget: Send + Sync {
  /// Loads the hosted script if needed. Idempotent once it has succeeded.
  async fn ensure_loaded(&self) -> std::result::Result<(), WidgetUnavailable>;

  /// Opens the widget. Returns once it is shown; the outcome arrives through
  /// `callbacks`, possibly much later.
  async fn open(&self, request: WidgetRequest, callbacks: WidgetCallbacks) -> std::result::Result<(), WidgetUnavailable>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
  Pending,
  Completed,
  Failed,
}

/// The gateway-side record of one payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTransaction {
  pub gateway_order_id: String,
  pub gateway_payment_id: Option<String>,
  pub gateway_signature: Option<String>,
  status: TransactionStatus,
}

impl PaymentTransaction {
  pub fn pending(gateway_order_id: impl Into<String>) -> Self {
    Self {
      gateway_order_id: gateway_order_id.into(),
      gateway_payment_id: None,
      gateway_signature: None,
      status: TransactionStatus::Pending,
    }
  }

  pub fn status(&self) -> TransactionStatus {
    self.status
  }

  pub fn is_terminal(&self) -> bool {
    self.status != TransactionStatus::Pending
  }

  /// Records a *verified* success.
  pub fn complete(&mut self, tokens: &GatewayTokens) -> Result<()> {
    self.ensure_pending()?;
    if tokens.order_id != self.gateway_order_id {
      return Err(StorefrontError::Validation(format!(
        "gateway tokens belong to order {} not {}",
        tokens.order_id, self.gateway_order_id
      )));
    }
    self.gateway_payment_id = Some(tokens.payment_id.clone());
    self.gateway_signature = Some(tokens.signature.clone());
    self.status = TransactionStatus::Completed;
    Ok(())
  }

  pub fn fail(&mut self) -> Result<()> {
    self.ensure_pending()?;
    self.status = TransactionStatus::Failed;
    Ok(())
  }

  fn ensure_pending(&self) -> Result<()> {
    if self.is_terminal() {
      return Err(StorefrontError::Internal(format!(
        "payment transaction {} already settled as {:?}",
        self.gateway_order_id, self.status
      )));
    }
    Ok(())
  }
}
