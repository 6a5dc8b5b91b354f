// storefront/src/checkout/context.rs

use super::outcome::CheckoutOutcome;
use super::state::CheckoutState;
use crate::config::StorefrontConfig;
use crate::order::{OrderIntent, OrderLedger};
use crate::payment::{CheckoutWidget, GatewayTokens, PaymentApi, PaymentIntent, PaymentTransaction, WidgetOutcome};
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Collaborators every checkout step may call.
pub struct CheckoutDeps {
  pub config: StorefrontConfig,
  pub payments: PaymentApi,
  pub ledger: OrderLedger,
  pub widget: Arc<dyn CheckoutWidget>,
}

impl std::fmt::Debug for CheckoutDeps {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CheckoutDeps")
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

/// Data threaded through the checkout pipeline for one attempt.
pub struct CheckoutCtxData {
  pub deps: Arc<CheckoutDeps>,
  /// Sent as the `Idempotency-Key` of the order-creation request.
  pub attempt_id: Uuid,
  pub intent: OrderIntent,
  pub state: CheckoutState,
  pub payment_intent: Option<PaymentIntent>,
  pub transaction: Option<PaymentTransaction>,
  pub pending_widget: Option<oneshot::Receiver<WidgetOutcome>>,
  pub tokens: Option<GatewayTokens>,
  pub outcome: Option<CheckoutOutcome>,
}

impl CheckoutCtxData {
  pub fn new(deps: Arc<CheckoutDeps>, intent: OrderIntent) -> Self {
    Self {
      deps,
      attempt_id: Uuid::new_v4(),
      intent,
      state: CheckoutState::Idle,
      payment_intent: None,
      transaction: None,
      pending_widget: None,
      tokens: None,
      outcome: None,
    }
  }

  /// Moves to a terminal state and records the outcome the flow returns.
  pub fn finish(&mut self, outcome: CheckoutOutcome) -> crate::error::Result<()> {
    self.state.transition(outcome.state())?;
    self.outcome = Some(outcome);
    Ok(())
  }
}
