// tests/checkout_tests.rs
mod common;

use common::*;
use rust_decimal::Decimal;
use serde_json::json;
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use storefront::checkout::outcome::{MSG_FAILED_OR_CANCELLED, MSG_WIDGET_BLOCKED};
use storefront::http::IDEMPOTENCY_KEY_HEADER;
use storefront::{
  CheckoutFlow, CheckoutOutcome, CheckoutState, CustomerSnapshot, GatewayFailureReason, OrderIntent, Product,
  QuantityWarning, StorefrontError,
};
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

fn intent(price: Decimal, quantity: i64) -> OrderIntent {
  let product = Product {
    id: PRODUCT_ID.to_string(),
    title: "Steel Kettle".to_string(),
    price,
    images: vec![],
    image: None,
  };
  let customer = CustomerSnapshot {
    name: "asha".into(),
    address: "12 MG Road".into(),
    phone: "9845000000".into(),
  };
  OrderIntent::from_navigation(&product, customer, Some(quantity), 10).0
}

fn flow(b: &Backend, widget: Arc<ScriptedWidget>) -> CheckoutFlow {
  CheckoutFlow::new(b.config.clone(), b.api.clone(), widget).expect("checkout flow")
}

async fn mount_verify_ok(b: &Backend) {
  mount_json(&b.server, "POST", "/payment/verify", 200, json!({"success": true})).await;
}

#[tokio::test]
#[serial]
async fn test_verified_payment_persists_exactly_one_order() {
  let b = backend().await;
  Mock::given(method("POST"))
    .and(path("/payment/create-order"))
    .and(body_partial_json(json!({"amount": 750.0, "currency": "INR", "meta": {"productId": PRODUCT_ID, "quantity": 3}})))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": GATEWAY_ORDER_ID, "amount": 75000, "currency": "INR"})))
    .expect(1)
    .mount(&b.server)
    .await;
  Mock::given(method("POST"))
    .and(path("/payment/verify"))
    .and(body_partial_json(json!({"razorpay_order_id": GATEWAY_ORDER_ID, "razorpay_payment_id": PAYMENT_ID})))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
    .expect(1)
    .mount(&b.server)
    .await;
  Mock::given(method("POST"))
    .and(path("/cart/create"))
    .and(header_exists(IDEMPOTENCY_KEY_HEADER))
    .and(body_partial_json(json!({
      "productId": PRODUCT_ID,
      "quantity": 3,
      "total": 750.0,
      "customer": {"name": "asha", "address": "12 MG Road", "phone": "9845000000"},
      "payment": {"razorpay_order_id": GATEWAY_ORDER_ID, "razorpay_payment_id": PAYMENT_ID, "razorpay_signature": "sig_valid"}
    })))
    .respond_with(ResponseTemplate::new(201).set_body_json(order_json(json!(750))))
    .expect(1)
    .mount(&b.server)
    .await;

  let widget = ScriptedWidget::new(WidgetScript::Succeed);
  let flow = flow(&b, widget.clone());
  let outcome = flow.place_order(&intent(Decimal::from(250), 3)).await.unwrap();

  match &outcome {
    CheckoutOutcome::OrderPersisted { order, navigate_to } => {
      assert_eq!(*navigate_to, "/orders");
      assert_eq!(order.as_ref().map(|o| o.order_id.as_str()), Some("ord_1"));
    }
    other => panic!("expected a persisted order, got {other:?}"),
  }
  assert_eq!(outcome.user_message(), "Payment successful!");
  assert!(!flow.is_submitting(PRODUCT_ID));

  // The widget saw the server's intent, not a recomputed amount.
  let opened = widget.opened.lock();
  assert_eq!(opened.len(), 1);
  assert_eq!(opened[0].gateway_order_id, GATEWAY_ORDER_ID);
  assert_eq!(opened[0].amount, Decimal::from(75000));
  assert_eq!(opened[0].key, GATEWAY_KEY);
}

#[tokio::test]
#[serial]
async fn test_fractional_price_total_is_exact() {
  let b = backend().await;
  Mock::given(method("POST"))
    .and(path("/payment/create-order"))
    .and(body_partial_json(json!({"amount": 598.5})))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": GATEWAY_ORDER_ID, "amount": 59850})))
    .expect(1)
    .mount(&b.server)
    .await;
  mount_verify_ok(&b).await;
  Mock::given(method("POST"))
    .and(path("/cart/create"))
    .and(body_partial_json(json!({"total": 598.5, "quantity": 3})))
    .respond_with(ResponseTemplate::new(201).set_body_json(order_json(json!(598.5))))
    .expect(1)
    .mount(&b.server)
    .await;

  let order_intent = intent(Decimal::new(19950, 2), 3);
  assert_eq!(order_intent.total(), Decimal::new(59850, 2));

  let outcome = flow(&b, ScriptedWidget::new(WidgetScript::Succeed))
    .place_order(&order_intent)
    .await
    .unwrap();
  assert!(outcome.is_success());
}

#[tokio::test]
#[serial]
async fn test_no_order_without_verified_payment() {
  let b = backend().await;
  mount_intent(&b.server, json!(75000)).await;
  Mock::given(method("POST"))
    .and(path("/payment/verify"))
    .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "invalid signature"})))
    .expect(1)
    .mount(&b.server)
    .await;
  Mock::given(method("POST"))
    .and(path("/cart/create"))
    .respond_with(ResponseTemplate::new(201))
    .expect(0)
    .mount(&b.server)
    .await;

  let outcome = flow(&b, ScriptedWidget::new(WidgetScript::Succeed))
    .place_order(&intent(Decimal::from(250), 3))
    .await
    .unwrap();

  assert!(matches!(
    outcome,
    CheckoutOutcome::GatewayFailed {
      reason: GatewayFailureReason::VerificationRejected(_)
    }
  ));
  assert_eq!(outcome.user_message(), MSG_FAILED_OR_CANCELLED);
}

#[tokio::test]
#[serial]
async fn test_verification_reporting_invalid_signature_blocks_the_order() {
  let b = backend().await;
  mount_intent(&b.server, json!(75000)).await;
  mount_json(&b.server, "POST", "/payment/verify", 200, json!({"success": false})).await;

  let outcome = flow(&b, ScriptedWidget::new(WidgetScript::Succeed))
    .place_order(&intent(Decimal::from(250), 3))
    .await
    .unwrap();

  assert_eq!(outcome.state(), CheckoutState::GatewayFailed);
  assert!(requests_to(&b.server, "/cart/create").await.is_empty());
}

#[tokio::test]
#[serial]
async fn test_duplicate_success_callback_creates_one_order() {
  let b = backend().await;
  mount_intent(&b.server, json!(75000)).await;
  mount_verify_ok(&b).await;
  mount_json(&b.server, "POST", "/cart/create", 201, order_json(json!(750))).await;

  let outcome = flow(&b, ScriptedWidget::new(WidgetScript::SucceedTwice))
    .place_order(&intent(Decimal::from(250), 3))
    .await
    .unwrap();
  assert!(outcome.is_success());

  // Let the late duplicate callback fire.
  tokio::time::sleep(Duration::from_millis(30)).await;
  assert_eq!(requests_to(&b.server, "/payment/verify").await.len(), 1);
  assert_eq!(requests_to(&b.server, "/cart/create").await.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_closing_the_widget_leaves_no_residue() {
  let b = backend().await;
  mount_intent(&b.server, json!(75000)).await;

  let flow = flow(&b, ScriptedWidget::new(WidgetScript::Dismiss));
  let outcome = flow.place_order(&intent(Decimal::from(250), 3)).await.unwrap();

  assert_eq!(outcome, CheckoutOutcome::Cancelled);
  assert!(!outcome.state().is_processing());
  assert!(!flow.is_submitting(PRODUCT_ID));
  assert!(requests_to(&b.server, "/payment/verify").await.is_empty());
  assert!(requests_to(&b.server, "/cart/create").await.is_empty());
  assert_eq!(outcome.user_message(), MSG_FAILED_OR_CANCELLED);
}

#[tokio::test]
#[serial]
async fn test_declined_payment_is_a_gateway_failure() {
  let b = backend().await;
  mount_intent(&b.server, json!(75000)).await;

  let outcome = flow(&b, ScriptedWidget::new(WidgetScript::Decline))
    .place_order(&intent(Decimal::from(250), 3))
    .await
    .unwrap();

  match &outcome {
    CheckoutOutcome::GatewayFailed {
      reason: GatewayFailureReason::Declined(failure),
    } => assert_eq!(failure.code.as_deref(), Some("BAD_REQUEST_ERROR")),
    other => panic!("expected a decline, got {other:?}"),
  }
  assert!(requests_to(&b.server, "/payment/verify").await.is_empty());
}

#[tokio::test]
#[serial]
async fn test_blocked_widget_script_has_its_own_message() {
  let b = backend().await;
  mount_intent(&b.server, json!(75000)).await;

  let widget = ScriptedWidget::new(WidgetScript::Blocked);
  let outcome = flow(&b, widget.clone())
    .place_order(&intent(Decimal::from(250), 3))
    .await
    .unwrap();

  assert!(matches!(
    outcome,
    CheckoutOutcome::GatewayFailed {
      reason: GatewayFailureReason::WidgetUnavailable(_)
    }
  ));
  assert_eq!(outcome.user_message(), MSG_WIDGET_BLOCKED);
  assert_ne!(outcome.user_message(), MSG_FAILED_OR_CANCELLED);
  assert_eq!(widget.loads.load(Ordering::SeqCst), 1);
  assert_eq!(widget.open_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_order_failure_after_verified_payment_is_surfaced_for_reconciliation() {
  let b = backend().await;
  mount_intent(&b.server, json!(75000)).await;
  mount_verify_ok(&b).await;
  Mock::given(method("POST"))
    .and(path("/cart/create"))
    .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
    .expect(1)
    .mount(&b.server)
    .await;

  let flow = flow(&b, ScriptedWidget::new(WidgetScript::Succeed));
  let outcome = flow.place_order(&intent(Decimal::from(250), 3)).await.unwrap();

  match &outcome {
    CheckoutOutcome::PersistFailed {
      gateway_order_id,
      gateway_payment_id,
      ..
    } => {
      assert_eq!(gateway_order_id, GATEWAY_ORDER_ID);
      assert_eq!(gateway_payment_id, PAYMENT_ID);
    }
    other => panic!("expected persist failure, got {other:?}"),
  }
  let message = outcome.user_message();
  assert!(message.contains(PAYMENT_ID));
  assert_ne!(message, MSG_FAILED_OR_CANCELLED);
  assert!(!flow.is_submitting(PRODUCT_ID));
}

#[tokio::test]
#[serial]
async fn test_plain_text_verification_success_still_records_the_order() {
  let b = backend().await;
  mount_intent(&b.server, json!(75000)).await;
  Mock::given(method("POST"))
    .and(path("/payment/verify"))
    .respond_with(ResponseTemplate::new(200).set_body_string("Payment verified"))
    .expect(1)
    .mount(&b.server)
    .await;
  Mock::given(method("POST"))
    .and(path("/cart/create"))
    .respond_with(ResponseTemplate::new(201).set_body_json(order_json(json!(750))))
    .expect(1)
    .mount(&b.server)
    .await;

  let outcome = flow(&b, ScriptedWidget::new(WidgetScript::Succeed))
    .place_order(&intent(Decimal::from(250), 3))
    .await
    .unwrap();

  assert_eq!(outcome.state(), CheckoutState::OrderPersisted);
  assert_eq!(requests_to(&b.server, "/cart/create").await.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_order_acknowledged_with_text_body_counts_as_persisted() {
  let b = backend().await;
  mount_intent(&b.server, json!(75000)).await;
  mount_verify_ok(&b).await;
  Mock::given(method("POST"))
    .and(path("/cart/create"))
    .respond_with(ResponseTemplate::new(201).set_body_string("Order created"))
    .expect(1)
    .mount(&b.server)
    .await;

  let flow = flow(&b, ScriptedWidget::new(WidgetScript::Succeed));
  let outcome = flow.place_order(&intent(Decimal::from(250), 3)).await.unwrap();

  match &outcome {
    CheckoutOutcome::OrderPersisted { order, navigate_to } => {
      assert!(order.is_none());
      assert_eq!(*navigate_to, "/orders");
    }
    other => panic!("expected a persisted order, got {other:?}"),
  }
  assert_eq!(outcome.user_message(), "Payment successful!");
}

#[tokio::test]
#[serial]
async fn test_intent_failure_never_opens_the_widget() {
  let b = backend().await;
  mount_json(&b.server, "POST", "/payment/create-order", 502, json!({"message": "gateway down"})).await;

  let widget = ScriptedWidget::new(WidgetScript::Succeed);
  let outcome = flow(&b, widget.clone())
    .place_order(&intent(Decimal::from(250), 3))
    .await
    .unwrap();

  assert!(matches!(
    outcome,
    CheckoutOutcome::GatewayFailed {
      reason: GatewayFailureReason::IntentCreation(_)
    }
  ));
  assert_eq!(widget.loads.load(Ordering::SeqCst), 0);
  assert_eq!(widget.open_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_intent_amount_drift_is_rejected() {
  let b = backend().await;
  mount_intent(&b.server, json!(70000)).await;

  let widget = ScriptedWidget::new(WidgetScript::Succeed);
  let outcome = flow(&b, widget.clone())
    .place_order(&intent(Decimal::from(250), 3))
    .await
    .unwrap();

  assert_eq!(
    outcome,
    CheckoutOutcome::GatewayFailed {
      reason: GatewayFailureReason::AmountMismatch {
        expected: Decimal::from(75000),
        echoed: Decimal::from(70000),
      }
    }
  );
  assert_eq!(widget.open_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_second_submission_while_in_flight_is_rejected() {
  let b = backend().await;
  mount_intent(&b.server, json!(75000)).await;
  mount_verify_ok(&b).await;
  mount_json(&b.server, "POST", "/cart/create", 201, order_json(json!(750))).await;

  let widget = ScriptedWidget::new(WidgetScript::Hold);
  let flow = flow(&b, widget.clone());
  let order_intent = intent(Decimal::from(250), 3);

  let running = {
    let flow = flow.clone();
    let order_intent = order_intent.clone();
    tokio::spawn(async move { flow.place_order(&order_intent).await })
  };
  for _ in 0..200 {
    if widget.open_count() == 1 {
      break;
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
  }
  assert_eq!(widget.open_count(), 1);
  assert!(flow.is_submitting(PRODUCT_ID));

  let second = flow.place_order(&order_intent).await;
  assert!(matches!(second, Err(StorefrontError::CheckoutInProgress { .. })));

  widget.release_success();
  let outcome = running.await.expect("checkout task").unwrap();
  assert!(outcome.is_success());
  assert!(!flow.is_submitting(PRODUCT_ID));
  assert_eq!(requests_to(&b.server, "/payment/create-order").await.len(), 1);
  assert_eq!(requests_to(&b.server, "/cart/create").await.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_quantity_outside_range_is_rejected_before_any_request() {
  let b = backend().await;
  let mut config = b.config.clone();
  config.max_quantity = 2;
  let flow = CheckoutFlow::new(config, b.api.clone(), ScriptedWidget::new(WidgetScript::Succeed)).unwrap();

  let err = flow.place_order(&intent(Decimal::from(250), 3)).await.unwrap_err();
  assert!(matches!(err, StorefrontError::QuantityOutOfRange { requested: 3, max: 2 }));
  assert!(requests_to(&b.server, "/payment/create-order").await.is_empty());
}

#[tokio::test]
#[serial]
async fn test_begin_loads_fresh_profile_and_limits_quantity() {
  let b = backend().await;
  mount_json(&b.server, "GET", &format!("/products/{PRODUCT_ID}"), 200, product_json(json!(199.5))).await;
  mount_json(&b.server, "GET", "/profile", 200, profile_json()).await;

  let flow = flow(&b, ScriptedWidget::new(WidgetScript::Succeed));
  let (order_intent, warning) = flow.begin(PRODUCT_ID, Some(25)).await.unwrap();

  assert_eq!(order_intent.quantity(), 10);
  assert_eq!(warning, Some(QuantityWarning::LimitedTo { requested: 25, max: 10 }));
  assert_eq!(order_intent.customer.phone, "9845000000");
  assert_eq!(order_intent.total(), Decimal::from(1995));

  let (default_qty, none) = flow.begin(PRODUCT_ID, None).await.unwrap();
  assert_eq!(default_qty.quantity(), 1);
  assert_eq!(none, None);
  assert_eq!(requests_to(&b.server, "/profile").await.len(), 2);
}
