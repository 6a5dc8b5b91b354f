// storefront/src/lib.rs

//! Storefront client core.
//!
//! The two pieces of a storefront front-end with real state transitions:
//!  - An access gate that decides whether a protected view may render, and
//!    where to send the visitor (with a return path) when it may not.
//!  - A checkout flow that takes one product and quantity through a hosted
//!    payment widget, verifies the payment server-side and records exactly
//!    one order.
//!
//! Around them sit the session handle, the catalog/profile reads, the order
//! ledger with delivery-date tracking and the admin order calls.
//!
//! The checkout flow runs on a small step pipeline (`Pipeline<TData, Err>`):
//! named steps with `before`/`on`/`after` handlers over shared
//! [`ContextData`], any of which may stop the run early.

pub mod core;
pub mod pipeline;
pub mod error;

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod gate;
pub mod http;
pub mod order;
pub mod payment;
pub mod session;

// --- Re-exports for the Public API ---

pub use crate::core::context::Handler;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};
pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{ApiError, FlowError, FlowResult, Result, StorefrontError};

pub use crate::catalog::{Catalog, CustomerProfile, CustomerSnapshot, Product};
pub use crate::checkout::{CheckoutFlow, CheckoutOutcome, CheckoutState, GatewayFailureReason};
pub use crate::config::{AmountUnit, StorefrontConfig};
pub use crate::gate::{AccessGate, AccessRequirement, DenyReason, GateDecision, GateState, Route, RouteTable};
pub use crate::http::ApiClient;
pub use crate::order::{AdminOrders, Order, OrderIntent, OrderLedger, OrderStatus, OrderTracker, QuantityWarning};
pub use crate::payment::{AdminPayments, CheckoutWidget, PaymentRecord, PaymentTally, GatewayFailure, GatewayTokens, WidgetCallbacks, WidgetOutcome, WidgetRequest, WidgetUnavailable};
pub use crate::session::{AdminUsers, Credentials, NewUser, Principal, Role, SessionContext};
