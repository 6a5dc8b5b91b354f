// tests/common/mod.rs
#![allow(dead_code)] // Not every test file uses every helper.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storefront::{
  ApiClient, CheckoutWidget, ContextData, FlowError, GatewayFailure, GatewayTokens, PipelineControl, StorefrontConfig,
  WidgetCallbacks, WidgetRequest, WidgetUnavailable,
};
use tracing::Level;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// --- Tracing ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Pipeline fixtures ---
/// Records which handlers ran and what they appended, in order.
#[derive(Clone, Debug, Default)]
pub struct StepTrail {
  pub visits: u32,
  pub note: String,
  pub executed: Vec<String>,
  pub halt_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TrailError {
  #[error("engine: {0}")]
  Flow(String),

  #[error("step rejected: {0}")]
  Rejected(String),
}

impl From<FlowError> for TrailError {
  fn from(fe: FlowError) -> Self {
    TrailError::Flow(format!("{fe:?}"))
  }
}

/// Appends `fragment` to the trail; stops the run if the trail says to halt here.
pub fn recording_handler(label: &'static str, fragment: &'static str) -> storefront::Handler<StepTrail, TrailError> {
  Box::new(move |ctx: ContextData<StepTrail>| {
    Box::pin(async move {
      let mut trail = ctx.write();
      trail.visits += 1;
      trail.note.push_str(fragment);
      trail.executed.push(label.to_string());
      tracing::debug!(target: "pipeline_fixtures", label, visits = trail.visits, "handler ran");
      if trail.halt_at.as_deref() == Some(label) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn rejecting_handler(label: &'static str, reason: &'static str) -> storefront::Handler<StepTrail, TrailError> {
  Box::new(move |ctx: ContextData<StepTrail>| {
    Box::pin(async move {
      ctx.write().executed.push(label.to_string());
      Err(TrailError::Rejected(reason.to_string()))
    })
  })
}

// --- Mock backend ---
pub const GATEWAY_KEY: &str = "rzp_test_key";
pub const PRODUCT_ID: &str = "66ab01";
pub const GATEWAY_ORDER_ID: &str = "order_Nx01";
pub const PAYMENT_ID: &str = "pay_Nx01";

pub struct Backend {
  pub server: MockServer,
  pub api: ApiClient,
  pub config: StorefrontConfig,
}

pub async fn backend() -> Backend {
  setup_tracing();
  let server = MockServer::start().await;
  let mut config = StorefrontConfig::new(server.uri(), GATEWAY_KEY);
  config.request_timeout = Duration::from_secs(5);
  config.verify_timeout = Duration::from_secs(5);
  config.order_timeout = Duration::from_secs(5);
  config.widget_load_timeout = Duration::from_secs(1);
  let api = ApiClient::new(&config.api_base_url, config.request_timeout).expect("api client");
  Backend { server, api, config }
}

pub fn product_json(price: Value) -> Value {
  json!({ "_id": PRODUCT_ID, "title": "Steel Kettle", "price": price, "images": ["kettle.png"] })
}

pub fn profile_json() -> Value {
  json!({ "user": {
    "username": "asha", "email": "asha@example.com", "mobile": "9845000000",
    "address": "12 MG Road", "city": "Bengaluru", "state": "KA", "zipCode": "560001"
  }})
}

pub fn order_json(total: Value) -> Value {
  json!({ "order": {
    "_id": "ord_1", "productId": PRODUCT_ID, "quantity": 3, "total": total, "status": "paid"
  }})
}

pub async fn mount_json(server: &MockServer, http_method: &str, route: &str, status: u16, body: Value) {
  Mock::given(method(http_method))
    .and(path(route))
    .respond_with(ResponseTemplate::new(status).set_body_json(body))
    .mount(server)
    .await;
}

pub async fn mount_intent(server: &MockServer, echoed_amount: Value) {
  mount_json(
    server,
    "POST",
    "/payment/create-order",
    200,
    json!({ "id": GATEWAY_ORDER_ID, "amount": echoed_amount, "currency": "INR" }),
  )
  .await;
}

pub async fn requests_to(server: &MockServer, route: &str) -> Vec<wiremock::Request> {
  server
    .received_requests()
    .await
    .unwrap_or_default()
    .into_iter()
    .filter(|r| r.url.path() == route)
    .collect()
}

pub fn tokens_for(gateway_order_id: &str) -> GatewayTokens {
  GatewayTokens {
    order_id: gateway_order_id.to_string(),
    payment_id: PAYMENT_ID.to_string(),
    signature: "sig_valid".to_string(),
  }
}

// --- Scripted payment widget ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetScript {
  Succeed,
  /// Fires the success callback twice, as a flaky widget might.
  SucceedTwice,
  Decline,
  /// Closes without firing either callback.
  Dismiss,
  /// The script never loads.
  Blocked,
  /// Keeps the callbacks until [`ScriptedWidget::release_success`].
  Hold,
}

#[derive(Debug)]
pub struct ScriptedWidget {
  script: WidgetScript,
  pub loads: AtomicUsize,
  pub opened: Mutex<Vec<WidgetRequest>>,
  held: Mutex<Option<(WidgetCallbacks, String)>>,
}

impl ScriptedWidget {
  pub fn new(script: WidgetScript) -> Arc<Self> {
    Arc::new(Self {
      script,
      loads: AtomicUsize::new(0),
      opened: Mutex::new(Vec::new()),
      held: Mutex::new(None),
    })
  }

  pub fn open_count(&self) -> usize {
    self.opened.lock().len()
  }

  pub fn release_success(&self) {
    if let Some((callbacks, order_id)) = self.held.lock().take() {
      callbacks.succeed(tokens_for(&order_id));
    }
  }
}

#[async_trait]
impl CheckoutWidget for ScriptedWidget {
  async fn ensure_loaded(&self) -> Result<(), WidgetUnavailable> {
    self.loads.fetch_add(1, Ordering::SeqCst);
    if self.script == WidgetScript::Blocked {
      return Err(WidgetUnavailable("script blocked by client".to_string()));
    }
    Ok(())
  }

  async fn open(&self, request: WidgetRequest, callbacks: WidgetCallbacks) -> Result<(), WidgetUnavailable> {
    let order_id = request.gateway_order_id.clone();
    self.opened.lock().push(request);
    match self.script {
      WidgetScript::Succeed => {
        callbacks.succeed(tokens_for(&order_id));
      }
      WidgetScript::SucceedTwice => {
        let second = callbacks.clone();
        tokio::spawn(async move {
          callbacks.succeed(tokens_for(&order_id));
          tokio::time::sleep(Duration::from_millis(5)).await;
          second.succeed(tokens_for(&order_id));
        });
      }
      WidgetScript::Decline => {
        callbacks.fail(GatewayFailure {
          code: Some("BAD_REQUEST_ERROR".to_string()),
          description: "Payment declined by bank".to_string(),
        });
      }
      WidgetScript::Dismiss => drop(callbacks),
      WidgetScript::Blocked => {}
      WidgetScript::Hold => {
        *self.held.lock() = Some((callbacks, order_id));
      }
    }
    Ok(())
  }
}
