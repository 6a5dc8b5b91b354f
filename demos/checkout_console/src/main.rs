// demos/checkout_console/src/main.rs

mod widget;

use anyhow::{bail, Context};
use std::env;
use std::sync::Arc;
use storefront::gate::RouteTable;
use storefront::{
  AccessGate, AccessRequirement, ApiClient, CheckoutFlow, Credentials, GateDecision, OrderLedger, OrderTracker, Route,
  SessionContext, StorefrontConfig,
};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use widget::{ConsoleWidget, DEFAULT_SCRIPT_URL};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  let mut args = env::args().skip(1);
  let product_id = args.next().context("usage: checkout_console <product-id> [quantity]")?;
  let quantity = args.next().map(|q| q.parse::<i64>()).transpose().context("quantity must be a number")?;

  let config = match StorefrontConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      tracing::error!(error = %e, "Failed to load storefront configuration.");
      return Err(e.into());
    }
  };

  let api = ApiClient::new(&config.api_base_url, config.request_timeout)?;
  let session = SessionContext::new(api.clone());

  if let (Ok(email), Ok(password)) = (env::var("STOREFRONT_EMAIL"), env::var("STOREFRONT_PASSWORD")) {
    session.login(&Credentials { email, password }).await?;
  }

  let route = Route::parse(&format!("/checkout/{product_id}"));
  let requirement = RouteTable::default()
    .requirement_for(&route)
    .unwrap_or(AccessRequirement::Authenticated);
  let gate = AccessGate::new(session.clone(), config.gate_retries);
  if let GateDecision::Deny { redirect_to, reason } = gate.evaluate(&route, requirement).await {
    println!("Not signed in ({reason:?}). Continue at {redirect_to}");
    return Ok(());
  }

  let script_url = env::var("STOREFRONT_CHECKOUT_SCRIPT_URL").unwrap_or_else(|_| DEFAULT_SCRIPT_URL.to_string());
  let flow = CheckoutFlow::new(config.clone(), api.clone(), Arc::new(ConsoleWidget::new(script_url)))?;

  let (intent, warning) = flow.begin(&product_id, quantity).await?;
  if let Some(w) = warning {
    println!("{w}");
  }
  println!(
    "{} x {} @ {} = {} {}",
    intent.quantity(),
    intent.title,
    intent.unit_price,
    intent.total(),
    config.currency
  );

  let outcome = flow.place_order(&intent).await?;
  println!("{}", outcome.user_message());

  match outcome.navigate_to() {
    Some(next) => {
      println!("-> {next}");
      let snapshot = OrderTracker::new(OrderLedger::new(api, config.order_timeout)).poll_once().await;
      println!("{} order(s) on file", snapshot.orders.len());
      for notice in snapshot.notices {
        println!("{}", notice.message());
      }
      Ok(())
    }
    None if outcome.state() == storefront::CheckoutState::PersistFailed => {
      bail!("payment taken but no order recorded; see the reconciliation log")
    }
    None => Ok(()),
  }
}
