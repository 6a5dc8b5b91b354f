// storefront/src/checkout/flow.rs

use super::context::{CheckoutCtxData, CheckoutDeps};
use super::outcome::CheckoutOutcome;
use super::pipeline::build_checkout_pipeline;
use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError};
use crate::http::ApiClient;
use crate::order::{OrderIntent, OrderLedger, QuantityWarning};
use crate::payment::{CheckoutWidget, PaymentApi};
use crate::{ContextData, Pipeline, PipelineResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Marks a product as having a checkout in flight. Released on drop, so every
/// exit path of `place_order` (including cancellation of its future) clears it.
struct InFlightGuard {
  in_flight: Arc<Mutex<HashSet<String>>>,
  product_id: String,
}

impl InFlightGuard {
  fn acquire(in_flight: &Arc<Mutex<HashSet<String>>>, product_id: &str) -> Result<Self> {
    if !in_flight.lock().insert(product_id.to_string()) {
      return Err(StorefrontError::CheckoutInProgress {
        product_id: product_id.to_string(),
      });
    }
    Ok(Self {
      in_flight: Arc::clone(in_flight),
      product_id: product_id.to_string(),
    })
  }
}

impl Drop for InFlightGuard {
  fn drop(&mut self) {
    self.in_flight.lock().remove(&self.product_id);
  }
}

/// Places single-product orders through the hosted payment gateway.
#[derive(Clone)]
pub struct CheckoutFlow {
  deps: Arc<CheckoutDeps>,
  catalog: Catalog,
  pipeline: Arc<Pipeline<CheckoutCtxData, StorefrontError>>,
  in_flight: Arc<Mutex<HashSet<String>>>,
}

impl CheckoutFlow {
  pub fn new(config: StorefrontConfig, api: ApiClient, widget: Arc<dyn CheckoutWidget>) -> Result<Self> {
    let deps = CheckoutDeps {
      payments: PaymentApi::new(api.clone(), config.verify_timeout),
      ledger: OrderLedger::new(api.clone(), config.order_timeout),
      config,
      widget,
    };
    Ok(Self {
      deps: Arc::new(deps),
      catalog: Catalog::new(api),
      pipeline: Arc::new(build_checkout_pipeline()?),
      in_flight: Arc::new(Mutex::new(HashSet::new())),
    })
  }

  pub fn config(&self) -> &StorefrontConfig {
    &self.deps.config
  }

  /// Loads the product and a fresh profile and builds the intent the checkout
  /// view starts from.
  #[instrument(name = "CheckoutFlow::begin", skip(self), err(Display))]
  pub async fn begin(&self, product_id: &str, nav_quantity: Option<i64>) -> Result<(OrderIntent, Option<QuantityWarning>)> {
    let (product, profile) = tokio::try_join!(self.catalog.product(product_id), self.catalog.fresh_profile())?;
    let (intent, warning) =
      OrderIntent::from_navigation(&product, profile.snapshot(), nav_quantity, self.deps.config.max_quantity);
    if let Some(w) = &warning {
      info!(warning = %w, "navigation quantity adjusted");
    }
    Ok((intent, warning))
  }

  /// Whether a checkout for `product_id` is currently running; backs the
  /// disabled state of the pay control.
  pub fn is_submitting(&self, product_id: &str) -> bool {
    self.in_flight.lock().contains(product_id)
  }

  /// Runs one checkout attempt to a terminal outcome.
  ///
  /// `Err` means the attempt never started (quantity out of range, another
  /// attempt for the same product in flight) or the flow itself faulted.
  /// Everything a buyer can run into is an `Ok` outcome.
  #[instrument(
    name = "CheckoutFlow::place_order",
    skip_all,
    fields(product_id = %intent.product_id, quantity = intent.quantity(), total = %intent.total()),
    err(Display)
  )]
  pub async fn place_order(&self, intent: &OrderIntent) -> Result<CheckoutOutcome> {
    let max = self.deps.config.max_quantity;
    if intent.quantity() == 0 || intent.quantity() > max {
      return Err(StorefrontError::QuantityOutOfRange {
        requested: intent.quantity(),
        max,
      });
    }

    let _guard = InFlightGuard::acquire(&self.in_flight, &intent.product_id)?;
    let ctx_data = ContextData::new(CheckoutCtxData::new(Arc::clone(&self.deps), intent.clone()));

    let result = self.pipeline.run(ctx_data.clone()).await?;
    let mut guard = ctx_data.write();
    debug!(?result, state = %guard.state, attempt_id = %guard.attempt_id, "checkout pipeline finished");
    match (result, guard.outcome.take()) {
      (_, Some(outcome)) => {
        info!(state = %outcome.state(), "checkout finished");
        Ok(outcome)
      }
      (PipelineResult::Completed | PipelineResult::Stopped, None) => Err(StorefrontError::Internal(format!(
        "checkout ended in state {} without an outcome",
        guard.state
      ))),
    }
  }
}
