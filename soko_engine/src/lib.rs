//! Soko Fulfilment Engine
//!
//! Soko is a marketplace where buyers order fresh produce from vendors (retail) and vendors restock from farmers
//! (bulk), with payment collected up-front via M-Pesa and held in escrow until a rider confirms delivery. This
//! library contains the core order, payment-reconciliation and delivery-dispatch logic. It is HTTP-framework
//! agnostic; the `soko_server` crate mounts these APIs behind actix-web routes.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to access the database directly.
//!    Instead, use the public API. The exception is the data types used in the database, which are defined in
//!    [`mod@db_types`] and are public.
//! 2. The public API ([`OrderFlowApi`], [`DispatchApi`], [`SettlementApi`], [`NotificationApi`]). Backends
//!    implement [`MarketplaceDatabase`] in order to drive these APIs; [`SqliteDatabase`] is the provided one.
//! 3. The event system ([`mod@events`]). Every order/task transition publishes an event. A simple actor framework
//!    lets callers hook into these events, which is how notifications get persisted without the core knowing
//!    anything about notification UX.
mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod mpesa_types;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use api::{
    task_objects,
    CartItem,
    DispatchApi,
    NotificationApi,
    OrderFlowApi,
    PlacedOrder,
    PricingConfig,
    SettlementApi,
};
pub use traits::{DeliveryFees, MarketplaceDatabase, MarketplaceError, PaymentGateway, PaymentGatewayError};
