// storefront/src/order/mod.rs

//! Orders: the pre-payment intent, the persisted record, and the calls that
//! create, list and update them.

pub mod admin;
pub mod intent;
pub mod ledger;
pub mod model;
pub mod tracker;

pub use admin::AdminOrders;
pub use intent::{to_gateway_amount, OrderIntent, QuantityWarning};
pub use ledger::OrderLedger;
pub use model::{CreateOrderRequest, DeliveryLog, Order, OrderStatus, PaymentReference, ProductRef};
pub use tracker::{EtaNotice, OrderSnapshot, OrderTracker};
