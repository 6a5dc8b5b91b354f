// storefront/src/checkout/pipeline.rs

//! The five checkout steps, run strictly in order over [`CheckoutCtxData`].
//!
//! A step that reaches a terminal outcome records it and stops the pipeline.
//! `Err` is reserved for faults in the flow itself.

use super::context::CheckoutCtxData;
use super::outcome::{CheckoutOutcome, GatewayFailureReason, ORDERS_PATH};
use super::state::CheckoutState;
use crate::error::{FlowError, StorefrontError};
use crate::order::{to_gateway_amount, CreateOrderRequest};
use crate::payment::{IntentMeta, PaymentTransaction, WidgetCallbacks, WidgetOutcome, WidgetRequest};
use crate::{ContextData, Pipeline, PipelineControl};
use tracing::{error, info, warn};

pub const CREATE_PAYMENT_INTENT: &str = "create_payment_intent";
pub const LOAD_CHECKOUT_WIDGET: &str = "load_checkout_widget";
pub const AWAIT_WIDGET_OUTCOME: &str = "await_widget_outcome";
pub const VERIFY_PAYMENT: &str = "verify_payment";
pub const PERSIST_ORDER: &str = "persist_order";

type StepResult = Result<PipelineControl, StorefrontError>;

pub fn build_checkout_pipeline() -> Result<Pipeline<CheckoutCtxData, StorefrontError>, FlowError> {
  let mut p = Pipeline::<CheckoutCtxData, StorefrontError>::new(&[
    (CREATE_PAYMENT_INTENT, false, None),
    (LOAD_CHECKOUT_WIDGET, false, None),
    (AWAIT_WIDGET_OUTCOME, false, None),
    (VERIFY_PAYMENT, false, None),
    (PERSIST_ORDER, false, None),
  ]);

  p.on_root(CREATE_PAYMENT_INTENT, create_payment_intent)?;
  p.on_root(LOAD_CHECKOUT_WIDGET, load_checkout_widget)?;
  p.on_root(AWAIT_WIDGET_OUTCOME, await_widget_outcome)?;
  p.on_root(VERIFY_PAYMENT, verify_payment)?;
  p.on_root(PERSIST_ORDER, persist_order)?;
  Ok(p)
}

fn stop_with(ctx_data: &ContextData<CheckoutCtxData>, outcome: CheckoutOutcome) -> StepResult {
  ctx_data.write().finish(outcome)?;
  Ok(PipelineControl::Stop)
}

fn gateway_failed(ctx_data: &ContextData<CheckoutCtxData>, reason: GatewayFailureReason) -> StepResult {
  if let Some(tx) = ctx_data.write().transaction.as_mut().filter(|tx| !tx.is_terminal()) {
    tx.fail()?;
  }
  stop_with(ctx_data, CheckoutOutcome::GatewayFailed { reason })
}

async fn create_payment_intent(ctx_data: ContextData<CheckoutCtxData>) -> StepResult {
  let (deps, total, meta, attempt_id) = {
    let guard = ctx_data.read();
    let meta = IntentMeta {
      product_id: guard.intent.product_id.clone(),
      quantity: guard.intent.quantity(),
      customer: guard.intent.customer.clone(),
    };
    (guard.deps.clone(), guard.intent.total(), meta, guard.attempt_id)
  };

  info!(%attempt_id, %total, product_id = %meta.product_id, "creating payment intent");
  let payment_intent = match deps.payments.create_intent(total, &deps.config.currency, &meta).await {
    Ok(intent) => intent,
    Err(e) => return gateway_failed(&ctx_data, GatewayFailureReason::IntentCreation(e.to_string())),
  };

  let expected = match to_gateway_amount(total, deps.config.gateway_amount_unit) {
    Ok(amount) => amount,
    Err(e) => return gateway_failed(&ctx_data, GatewayFailureReason::IntentCreation(e.to_string())),
  };
  if payment_intent.amount != expected {
    error!(
      %attempt_id,
      gateway_order_id = %payment_intent.id,
      %expected,
      echoed = %payment_intent.amount,
      "payment intent amount does not match the order total"
    );
    return gateway_failed(
      &ctx_data,
      GatewayFailureReason::AmountMismatch {
        expected,
        echoed: payment_intent.amount,
      },
    );
  }

  let mut guard = ctx_data.write();
  guard.transaction = Some(PaymentTransaction::pending(payment_intent.id.clone()));
  guard.payment_intent = Some(payment_intent);
  guard.state.transition(CheckoutState::IntentCreated)?;
  Ok(PipelineControl::Continue)
}

async fn load_checkout_widget(ctx_data: ContextData<CheckoutCtxData>) -> StepResult {
  let deps = ctx_data.read().deps.clone();
  let limit = deps.config.widget_load_timeout;

  let loaded = match tokio::time::timeout(limit, deps.widget.ensure_loaded()).await {
    Ok(result) => result.map_err(|e| e.to_string()),
    Err(_) => Err(format!("checkout script did not load within {}s", limit.as_secs())),
  };
  match loaded {
    Ok(()) => Ok(PipelineControl::Continue),
    Err(reason) => {
      warn!(%reason, "checkout widget unavailable");
      gateway_failed(&ctx_data, GatewayFailureReason::WidgetUnavailable(reason))
    }
  }
}

/// Opens the widget with the server's intent and waits, without a deadline,
/// for it to settle.
async fn await_widget_outcome(ctx_data: ContextData<CheckoutCtxData>) -> StepResult {
  let (deps, request) = {
    let guard = ctx_data.read();
    let payment_intent = guard
      .payment_intent
      .as_ref()
      .ok_or_else(|| StorefrontError::Internal("widget step reached without a payment intent".to_string()))?;
    let config = &guard.deps.config;
    let request = WidgetRequest {
      key: payment_intent.key_id.clone().unwrap_or_else(|| config.gateway_key.clone()),
      gateway_order_id: payment_intent.id.clone(),
      amount: payment_intent.amount,
      currency: payment_intent.currency.clone().unwrap_or_else(|| config.currency.clone()),
      merchant_name: config.merchant_name.clone(),
      description: format!("{} x {}", guard.intent.quantity(), guard.intent.title),
      prefill: guard.intent.customer.clone(),
    };
    (guard.deps.clone(), request)
  };

  let (callbacks, rx) = WidgetCallbacks::channel();
  {
    let mut guard = ctx_data.write();
    guard.state.transition(CheckoutState::WidgetOpen)?;
    guard.pending_widget = Some(rx);
  }

  if let Err(e) = deps.widget.open(request, callbacks).await {
    ctx_data.write().pending_widget = None;
    return gateway_failed(&ctx_data, GatewayFailureReason::WidgetUnavailable(e.to_string()));
  }

  let rx = ctx_data
    .write()
    .pending_widget
    .take()
    .ok_or_else(|| StorefrontError::Internal("widget receiver missing".to_string()))?;

  match WidgetCallbacks::outcome(rx).await {
    WidgetOutcome::Succeeded(tokens) => {
      info!(gateway_order_id = %tokens.order_id, gateway_payment_id = %tokens.payment_id, "widget reported success");
      let mut guard = ctx_data.write();
      guard.tokens = Some(tokens);
      guard.state.transition(CheckoutState::Verifying)?;
      Ok(PipelineControl::Continue)
    }
    WidgetOutcome::Failed(failure) => {
      info!(description = %failure.description, "widget reported a failed payment");
      gateway_failed(&ctx_data, GatewayFailureReason::Declined(failure))
    }
    WidgetOutcome::Dismissed => {
      info!("widget closed without a result");
      if let Some(tx) = ctx_data.write().transaction.as_mut() {
        tx.fail()?;
      }
      stop_with(&ctx_data, CheckoutOutcome::Cancelled)
    }
  }
}

async fn verify_payment(ctx_data: ContextData<CheckoutCtxData>) -> StepResult {
  let (deps, tokens, attempt_id) = {
    let guard = ctx_data.read();
    let tokens = guard
      .tokens
      .clone()
      .ok_or_else(|| StorefrontError::Internal("verification reached without gateway tokens".to_string()))?;
    (guard.deps.clone(), tokens, guard.attempt_id)
  };

  let rejection = match deps.payments.verify(&tokens).await {
    Ok(true) => {
      let mut guard = ctx_data.write();
      match guard.transaction.as_mut().map(|tx| tx.complete(&tokens)) {
        Some(Ok(())) => None,
        Some(Err(e)) => Some(e.to_string()),
        None => Some("no pending payment transaction".to_string()),
      }
    }
    Ok(false) => Some("signature reported invalid".to_string()),
    Err(e) => Some(e.to_string()),
  };

  match rejection {
    None => Ok(PipelineControl::Continue),
    Some(reason) => {
      error!(
        target: "storefront::reconciliation",
        %attempt_id,
        gateway_order_id = %tokens.order_id,
        gateway_payment_id = %tokens.payment_id,
        %reason,
        "widget reported success but verification failed; no order recorded"
      );
      gateway_failed(&ctx_data, GatewayFailureReason::VerificationRejected(reason))
    }
  }
}

/// Issues exactly one order-creation request for the verified payment.
async fn persist_order(ctx_data: ContextData<CheckoutCtxData>) -> StepResult {
  let (deps, request, attempt_id) = {
    let guard = ctx_data.read();
    let tokens = guard
      .tokens
      .clone()
      .ok_or_else(|| StorefrontError::Internal("order step reached without verified tokens".to_string()))?;
    let request = CreateOrderRequest {
      product_id: guard.intent.product_id.clone(),
      quantity: guard.intent.quantity(),
      customer: guard.intent.customer.clone(),
      total: guard.intent.total(),
      payment: tokens,
    };
    (guard.deps.clone(), request, guard.attempt_id)
  };

  let key = attempt_id.to_string();
  match deps.ledger.create(&request, &key).await {
    Ok(order) => {
      ctx_data.write().finish(CheckoutOutcome::OrderPersisted {
        order,
        navigate_to: ORDERS_PATH,
      })?;
      Ok(PipelineControl::Continue)
    }
    Err(e) => {
      error!(
        target: "storefront::reconciliation",
        %attempt_id,
        gateway_order_id = %request.payment.order_id,
        gateway_payment_id = %request.payment.payment_id,
        total = %request.total,
        error = %e,
        "verified payment has no order record"
      );
      ctx_data.write().finish(CheckoutOutcome::PersistFailed {
        gateway_order_id: request.payment.order_id.clone(),
        gateway_payment_id: request.payment.payment_id.clone(),
        reason: e.to_string(),
      })?;
      Ok(PipelineControl::Continue)
    }
  }
}

