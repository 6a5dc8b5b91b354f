// storefront/src/payment/mod.rs

//! Payment gateway adapter: backend intent/verify calls, the widget seam and
//! the admin payments review.

pub mod admin;
pub mod api;
pub mod widget;

pub use admin::{AdminPayments, PayerRef, PaymentRecord, PaymentTally};
pub use api::{GatewayTokens, IntentMeta, PaymentApi, PaymentIntent};
pub use widget::{
  CheckoutWidget, GatewayFailure, PaymentTransaction, TransactionStatus, WidgetCallbacks, WidgetOutcome, WidgetRequest,
  WidgetUnavailable,
};
