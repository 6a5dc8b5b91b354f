// storefront/src/order/intent.rs

//! The not-yet-paid "N units of product P" a checkout view holds.

use crate::catalog::{CustomerSnapshot, Product};
use crate::config::AmountUnit;
use crate::error::{Result, StorefrontError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Feedback for a quantity change that could not be applied as asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuantityWarning {
  #[error("Maximum {max} items allowed")]
  AtMaximum { max: u32 },
  #[error("Requested {requested} items; limited to {max}")]
  LimitedTo { requested: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
  pub product_id: String,
  pub title: String,
  pub unit_price: Decimal,
  pub customer: CustomerSnapshot,
  quantity: u32,
  max_quantity: u32,
}

impl OrderIntent {
  /// Builds the intent a checkout view mounts with.
  ///
  /// `nav_quantity` is whatever the previous page passed along: absent or
  /// non-positive becomes 1, above `max_quantity` becomes `max_quantity` with a
  /// warning for the caller to show.
  pub fn from_navigation(
    product: &Product,
    customer: CustomerSnapshot,
    nav_quantity: Option<i64>,
    max_quantity: u32,
  ) -> (Self, Option<QuantityWarning>) {
    let max_quantity = max_quantity.max(1);
    let requested = nav_quantity.filter(|q| *q > 0).unwrap_or(1);
    let (quantity, warning) = match u32::try_from(requested) {
      Ok(q) if q <= max_quantity => (q, None),
      _ => (
        max_quantity,
        Some(QuantityWarning::LimitedTo {
          requested: u32::try_from(requested).unwrap_or(u32::MAX),
          max: max_quantity,
        }),
      ),
    };

    let intent = Self {
      product_id: product.id.clone(),
      title: product.title.clone(),
      unit_price: product.price,
      customer,
      quantity,
      max_quantity,
    };
    (intent, warning)
  }

  pub fn quantity(&self) -> u32 {
    self.quantity
  }

  pub fn max_quantity(&self) -> u32 {
    self.max_quantity
  }

  /// Sets an explicit quantity; out-of-range values are rejected, never clamped.
  pub fn set_quantity(&mut self, quantity: u32) -> Result<()> {
    if quantity == 0 || quantity > self.max_quantity {
      return Err(StorefrontError::QuantityOutOfRange {
        requested: quantity,
        max: self.max_quantity,
      });
    }
    self.quantity = quantity;
    Ok(())
  }

  /// The `+` control. At the maximum the quantity stays put and a warning comes back.
  pub fn increment(&mut self) -> std::result::Result<u32, QuantityWarning> {
    if self.quantity >= self.max_quantity {
      return Err(QuantityWarning::AtMaximum { max: self.max_quantity });
    }
    self.quantity += 1;
    Ok(self.quantity)
  }

  /// The `-` control. Never goes below one.
  pub fn decrement(&mut self) -> u32 {
    self.quantity = self.quantity.saturating_sub(1).max(1);
    self.quantity
  }

  /// `unit_price × quantity`, exact.
  pub fn total(&self) -> Decimal {
    self.unit_price * Decimal::from(self.quantity)
  }
}

/// Expresses `total` in the unit the gateway uses.
///
/// Minor units must come out integral; a price with more than two decimals
/// cannot be charged as-is and is reported rather than rounded.
pub fn to_gateway_amount(total: Decimal, unit: AmountUnit) -> Result<Decimal> {
  match unit {
    AmountUnit::Major => Ok(total.normalize()),
    AmountUnit::Minor => {
      let minor = total * Decimal::ONE_HUNDRED;
      if minor.fract() != Decimal::ZERO {
        return Err(StorefrontError::Validation(format!(
          "amount {total} has sub-minor-unit precision"
        )));
      }
      minor
        .trunc()
        .to_i64()
        .map(Decimal::from)
        .ok_or_else(|| StorefrontError::Validation(format!("amount {total} out of range")))
    }
  }
}
