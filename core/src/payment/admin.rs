// storefront/src/payment/admin.rs

//! The operations-side payments review: every gateway payment the backend has
//! recorded, whether or not it ended in an order.

use super::widget::TransactionStatus;
use crate::error::Result;
use crate::order::ProductRef;
use crate::session::SessionContext;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::form_urlencoded;

pub const ADMIN_PAYMENTS_PATH: &str = "/admin/payments";

/// The payer as the backend reports it: a bare user id or a populated user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PayerRef {
  Id(String),
  Profile {
    #[serde(default, alias = "_id")]
    id: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
  },
}

impl PayerRef {
  pub fn email(&self) -> Option<&str> {
    match self {
      PayerRef::Id(_) => None,
      PayerRef::Profile { email, .. } => email.as_deref(),
    }
  }

  fn label(&self) -> Option<&str> {
    match self {
      PayerRef::Id(_) => None,
      PayerRef::Profile { username, email, .. } => username.as_deref().or(email.as_deref()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
  /// Gateway order id; also the key `get` looks records up by.
  pub order_id: String,
  #[serde(default)]
  pub payment_id: Option<String>,
  pub status: TransactionStatus,
  #[serde(default)]
  pub amount: Option<Decimal>,
  #[serde(default)]
  pub currency: Option<String>,
  #[serde(default, rename = "userId")]
  pub payer: Option<PayerRef>,
  #[serde(default)]
  pub product: Option<ProductRef>,
  #[serde(default)]
  pub meta: Option<serde_json::Value>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
  /// Username, else email, else "Guest".
  pub fn payer_label(&self) -> &str {
    self.payer.as_ref().and_then(PayerRef::label).unwrap_or("Guest")
  }
}

/// Counts per status, as shown above the payments list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentTally {
  pub completed: usize,
  pub failed: usize,
  pub pending: usize,
}

impl PaymentTally {
  pub fn of(records: &[PaymentRecord]) -> Self {
    records.iter().fold(Self::default(), |mut tally, record| {
      match record.status {
        TransactionStatus::Completed => tally.completed += 1,
        TransactionStatus::Failed => tally.failed += 1,
        TransactionStatus::Pending => tally.pending += 1,
      }
      tally
    })
  }
}

#[derive(Debug, Deserialize)]
struct PaymentList {
  #[serde(default)]
  payments: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PaymentEnvelope {
  #[serde(default)]
  payment: Option<PaymentRecord>,
}

/// Admin-only payment lookups.
#[derive(Debug, Clone)]
pub struct AdminPayments {
  session: SessionContext,
}

impl AdminPayments {
  pub fn new(session: SessionContext) -> Self {
    Self { session }
  }

  /// All recorded payments, newest first. Entries that do not read as a
  /// payment are skipped.
  #[instrument(name = "AdminPayments::list", skip_all, err(Display))]
  pub async fn list(&self) -> Result<Vec<PaymentRecord>> {
    self.session.require_admin()?;
    let list: PaymentList = self.session.api().get_json(ADMIN_PAYMENTS_PATH).await?;
    let mut records: Vec<PaymentRecord> = list
      .payments
      .into_iter()
      .filter_map(|entry| {
        serde_json::from_value(entry)
          .map_err(|e| warn!(error = %e, "skipping unreadable payment record"))
          .ok()
      })
      .collect();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    debug!(count = records.len(), "payments loaded");
    Ok(records)
  }

  /// One payment by gateway order id. `None` when the backend has no record.
  #[instrument(name = "AdminPayments::get", skip(self), err(Display))]
  pub async fn get(&self, gateway_order_id: &str) -> Result<Option<PaymentRecord>> {
    self.session.require_admin()?;
    let segment: String = form_urlencoded::byte_serialize(gateway_order_id.as_bytes()).collect();
    let envelope: PaymentEnvelope = self
      .session
      .api()
      .get_json(&format!("{ADMIN_PAYMENTS_PATH}/{segment}"))
      .await?;
    Ok(envelope.payment)
  }
}
