// storefront/src/checkout/state.rs

use crate::error::{Result, StorefrontError};
use std::fmt;

/// Where one checkout attempt stands.
///
/// `Idle → IntentCreated → WidgetOpen → Verifying → {OrderPersisted, PersistFailed}`,
/// with `GatewayFailed` reachable before verification completes and
/// `Cancelled` reachable only while the widget is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutState {
  Idle,
  IntentCreated,
  WidgetOpen,
  Verifying,
  OrderPersisted,
  PersistFailed,
  Cancelled,
  GatewayFailed,
}

impl CheckoutState {
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      CheckoutState::OrderPersisted | CheckoutState::PersistFailed | CheckoutState::Cancelled | CheckoutState::GatewayFailed
    )
  }

  /// True while a "processing" indicator should be shown.
  pub fn is_processing(self) -> bool {
    !self.is_terminal() && self != CheckoutState::Idle
  }

  pub fn can_transition_to(self, next: CheckoutState) -> bool {
    use CheckoutState::*;
    matches!(
      (self, next),
      (Idle, IntentCreated)
        | (Idle, GatewayFailed)
        | (IntentCreated, WidgetOpen)
        | (IntentCreated, GatewayFailed)
        | (WidgetOpen, Verifying)
        | (WidgetOpen, Cancelled)
        | (WidgetOpen, GatewayFailed)
        | (Verifying, GatewayFailed)
        | (Verifying, OrderPersisted)
        | (Verifying, PersistFailed)
    )
  }

  pub fn transition(&mut self, next: CheckoutState) -> Result<()> {
    if !self.can_transition_to(next) {
      return Err(StorefrontError::Internal(format!(
        "illegal checkout transition {self} -> {next}"
      )));
    }
    *self = next;
    Ok(())
  }
}

impl fmt::Display for CheckoutState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      CheckoutState::Idle => "idle",
      CheckoutState::IntentCreated => "intent-created",
      CheckoutState::WidgetOpen => "widget-open",
      CheckoutState::Verifying => "verifying",
      CheckoutState::OrderPersisted => "order-persisted",
      CheckoutState::PersistFailed => "persist-failed",
      CheckoutState::Cancelled => "cancelled",
      CheckoutState::GatewayFailed => "gateway-failed",
    };
    f.write_str(name)
  }
}
