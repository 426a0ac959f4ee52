mod dispatch_api;
mod notification_api;
mod order_flow_api;
mod settlement_api;
pub mod task_objects;

pub use dispatch_api::DispatchApi;
pub use notification_api::NotificationApi;
pub use order_flow_api::{CartItem, OrderFlowApi, PlacedOrder, PricingConfig};
pub use settlement_api::SettlementApi;
