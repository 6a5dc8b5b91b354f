// storefront/src/checkout/mod.rs

//! Single-product checkout: payment intent, hosted widget, server-side
//! verification, then exactly one order record.

pub mod context;
pub mod flow;
pub mod outcome;
pub mod pipeline;
pub mod state;

pub use context::{CheckoutCtxData, CheckoutDeps};
pub use flow::CheckoutFlow;
pub use outcome::{CheckoutOutcome, GatewayFailureReason};
pub use pipeline::build_checkout_pipeline;
pub use state::CheckoutState;
