//! The seams between the engine and the outside world: the storage backend and the payment gateway.

mod marketplace_database;
mod payment_gateway;

pub use marketplace_database::{DeliveryFees, MarketplaceDatabase, MarketplaceError};
pub use payment_gateway::{PaymentGateway, PaymentGatewayError};
