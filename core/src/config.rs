// storefront/src/config.rs

use crate::error::{Result, StorefrontError};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

const LOCAL_API_BASE_URL: &str = "http://localhost:3000";

/// Unit the payment gateway uses for the `amount` it echoes back on a
/// created payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountUnit {
  /// Smallest currency unit (paise, cents). `598.50` becomes `59850`.
  Minor,
  /// Whole currency units, as sent by the client.
  Major,
}

impl std::str::FromStr for AmountUnit {
  type Err = StorefrontError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "minor" => Ok(AmountUnit::Minor),
      "major" => Ok(AmountUnit::Major),
      other => Err(StorefrontError::Config(format!(
        "Invalid STOREFRONT_GATEWAY_AMOUNT_UNIT '{other}' (expected 'minor' or 'major')"
      ))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
  pub api_base_url: String,
  pub gateway_key: String,
  pub merchant_name: String,
  pub currency: String,
  pub gateway_amount_unit: AmountUnit,
  pub max_quantity: u32,

  /// Extra identity-query attempts the access gate makes on transient failures.
  pub gate_retries: u32,

  pub widget_load_timeout: Duration,
  pub verify_timeout: Duration,
  pub order_timeout: Duration,
  pub request_timeout: Duration,
}

impl StorefrontConfig {
  /// Builds a config with defaults for everything but the two values that have none.
  pub fn new(api_base_url: impl Into<String>, gateway_key: impl Into<String>) -> Self {
    Self {
      api_base_url: api_base_url.into(),
      gateway_key: gateway_key.into(),
      merchant_name: "Storefront".to_string(),
      currency: "INR".to_string(),
      gateway_amount_unit: AmountUnit::Minor,
      max_quantity: 10,
      gate_retries: 0,
      widget_load_timeout: Duration::from_secs(10),
      verify_timeout: Duration::from_secs(20),
      order_timeout: Duration::from_secs(20),
      request_timeout: Duration::from_secs(30),
    }
  }

  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| StorefrontError::Config(format!("Missing environment variable '{var_name}': {e}")))
    };
    let parse_u64 = |var_name: &str, default: u64| -> Result<u64> {
      match env::var(var_name) {
        Ok(raw) => raw
          .trim()
          .parse::<u64>()
          .map_err(|e| StorefrontError::Config(format!("Invalid {var_name}: {e}"))),
        Err(_) => Ok(default),
      }
    };

    let development = get_env("STOREFRONT_ENV")
      .map(|v| v.eq_ignore_ascii_case("development"))
      .unwrap_or(false);

    let api_base_url = match get_env("STOREFRONT_API_BASE_URL") {
      Ok(url) => url,
      Err(_) if development => LOCAL_API_BASE_URL.to_string(),
      Err(e) => return Err(e),
    };

    // Required in every environment, no fallback key.
    let gateway_key = get_env("STOREFRONT_GATEWAY_KEY")?;
    if gateway_key.trim().is_empty() {
      return Err(StorefrontError::Config("STOREFRONT_GATEWAY_KEY is empty".to_string()));
    }

    let mut config = Self::new(api_base_url, gateway_key);
    if let Ok(name) = get_env("STOREFRONT_MERCHANT_NAME") {
      config.merchant_name = name;
    }
    if let Ok(currency) = get_env("STOREFRONT_CURRENCY") {
      config.currency = currency;
    }
    if let Ok(unit) = get_env("STOREFRONT_GATEWAY_AMOUNT_UNIT") {
      config.gateway_amount_unit = unit.parse()?;
    }

    let max_quantity = parse_u64("STOREFRONT_MAX_QUANTITY", u64::from(config.max_quantity))?;
    config.max_quantity = u32::try_from(max_quantity)
      .ok()
      .filter(|m| *m >= 1)
      .ok_or_else(|| StorefrontError::Config(format!("Invalid STOREFRONT_MAX_QUANTITY: {max_quantity}")))?;

    config.gate_retries = u32::try_from(parse_u64("STOREFRONT_GATE_RETRIES", 0)?)
      .map_err(|e| StorefrontError::Config(format!("Invalid STOREFRONT_GATE_RETRIES: {e}")))?;
    config.widget_load_timeout = Duration::from_secs(parse_u64("STOREFRONT_WIDGET_LOAD_TIMEOUT_SECS", 10)?);
    config.verify_timeout = Duration::from_secs(parse_u64("STOREFRONT_VERIFY_TIMEOUT_SECS", 20)?);
    config.order_timeout = Duration::from_secs(parse_u64("STOREFRONT_ORDER_TIMEOUT_SECS", 20)?);
    config.request_timeout = Duration::from_secs(parse_u64("STOREFRONT_REQUEST_TIMEOUT_SECS", 30)?);

    tracing::info!(
      api_base_url = %config.api_base_url,
      currency = %config.currency,
      development,
      "Storefront configuration loaded."
    );
    Ok(config)
  }
}
