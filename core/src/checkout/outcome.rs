// storefront/src/checkout/outcome.rs

use super::state::CheckoutState;
use crate::order::Order;
use crate::payment::GatewayFailure;
use rust_decimal::Decimal;

pub const ORDERS_PATH: &str = "/orders";

pub const MSG_SUCCESS: &str = "Payment successful!";
pub const MSG_FAILED_OR_CANCELLED: &str = "Payment failed or cancelled.";
pub const MSG_WIDGET_BLOCKED: &str =
  "Payment blocked by browser/extension. Allow the payment window (disable ad-blockers for this site) and try again.";
pub const MSG_INTENT_FAILED: &str = "Could not start the payment. Please try again.";

/// Why the gateway side of a checkout did not produce a trustworthy payment.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayFailureReason {
  /// `POST /payment/create-order` failed.
  IntentCreation(String),
  /// The server's intent amount disagrees with the client total.
  AmountMismatch { expected: Decimal, echoed: Decimal },
  WidgetUnavailable(String),
  Declined(GatewayFailure),
  /// The widget reported success but the backend did not confirm the signature.
  VerificationRejected(String),
}

/// Terminal result of one checkout attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
  OrderPersisted {
    /// `None` if the backend acknowledged without returning the record.
    order: Option<Order>,
    navigate_to: &'static str,
  },
  /// Money moved, no order record. Needs manual reconciliation.
  PersistFailed {
    gateway_order_id: String,
    gateway_payment_id: String,
    reason: String,
  },
  Cancelled,
  GatewayFailed { reason: GatewayFailureReason },
}

impl CheckoutOutcome {
  pub fn state(&self) -> CheckoutState {
    match self {
      CheckoutOutcome::OrderPersisted { .. } => CheckoutState::OrderPersisted,
      CheckoutOutcome::PersistFailed { .. } => CheckoutState::PersistFailed,
      CheckoutOutcome::Cancelled => CheckoutState::Cancelled,
      CheckoutOutcome::GatewayFailed { .. } => CheckoutState::GatewayFailed,
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, CheckoutOutcome::OrderPersisted { .. })
  }

  /// Where the view should navigate, if anywhere.
  pub fn navigate_to(&self) -> Option<&'static str> {
    match self {
      CheckoutOutcome::OrderPersisted { navigate_to, .. } => Some(*navigate_to),
      _ => None,
    }
  }

  /// Toast text for the outcome.
  pub fn user_message(&self) -> String {
    match self {
      CheckoutOutcome::OrderPersisted { .. } => MSG_SUCCESS.to_string(),
      CheckoutOutcome::PersistFailed {
        gateway_order_id,
        gateway_payment_id,
        ..
      } => format!(
        "Payment succeeded but we could not record your order. Please contact support with payment reference {gateway_payment_id} (gateway order {gateway_order_id})."
      ),
      CheckoutOutcome::Cancelled => MSG_FAILED_OR_CANCELLED.to_string(),
      CheckoutOutcome::GatewayFailed { reason } => match reason {
        GatewayFailureReason::WidgetUnavailable(_) => MSG_WIDGET_BLOCKED.to_string(),
        GatewayFailureReason::IntentCreation(_) | GatewayFailureReason::AmountMismatch { .. } => {
          MSG_INTENT_FAILED.to_string()
        }
        GatewayFailureReason::Declined(_) | GatewayFailureReason::VerificationRejected(_) => {
          MSG_FAILED_OR_CANCELLED.to_string()
        }
      },
    }
  }
}
