use std::future::Future;

use thiserror::Error;

use crate::db_types::{
    CallbackOutcome,
    DeliveryTask,
    EscrowSummary,
    NewDeliveryTask,
    NewNotification,
    NewOrder,
    Order,
    OrderId,
    OrderItem,
    PaymentUpdate,
    Product,
    TaskId,
    UserId,
};
use soko_common::Money;

/// This trait defines the highest level of behaviour for backends supporting the Soko fulfilment engine.
///
/// This behaviour includes:
/// * Reading the catalog snapshot during order placement.
/// * Persisting placed orders with price-snapshotted line items.
/// * Applying (idempotently) the gateway's asynchronous payment result.
/// * The delivery-task state machine: creation on seller acceptance, atomic courier claiming, and the two
///   code-verified handoff transitions.
/// * The on-demand escrow aggregate.
///
/// Every mutating operation encodes its state-machine guard in the storage engine's own atomic primitives
/// (conditional single-statement updates, uniqueness constraints), never in read-then-write sequences.
pub trait MarketplaceDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    //------------------------------------------ Catalog snapshot ------------------------------------------------

    /// Resolves a product to its authoritative {price, seller, name}. Client-supplied prices are never trusted.
    fn fetch_product(&self, product_id: &str) -> impl Future<Output = Result<Option<Product>, MarketplaceError>> + Send;

    /// Inserts or replaces a catalog entry. The catalog proper is another system; this exists for seeding and
    /// tooling.
    fn upsert_product(&self, product: Product) -> impl Future<Output = Result<(), MarketplaceError>> + Send;

    //------------------------------------------ Orders -----------------------------------------------------------

    /// Persists a placed order and its line items in a single transaction. The order starts out
    /// Pending/Processing with its checkout request id already set, so the callback can always be correlated.
    fn insert_order(&self, order: NewOrder) -> impl Future<Output = Result<Order, MarketplaceError>> + Send;

    fn fetch_order(&self, id: &OrderId) -> impl Future<Output = Result<Option<Order>, MarketplaceError>> + Send;

    fn fetch_order_items(&self, id: &OrderId) -> impl Future<Output = Result<Vec<OrderItem>, MarketplaceError>> + Send;

    fn fetch_orders_for_buyer(&self, buyer: &UserId) -> impl Future<Output = Result<Vec<Order>, MarketplaceError>> + Send;

    /// All orders containing at least one line item sold by `seller`, newest first.
    fn fetch_orders_for_seller(&self, seller: &UserId) -> impl Future<Output = Result<Vec<Order>, MarketplaceError>> + Send;

    /// Applies the asynchronous payment result. Must be safe under at-least-once delivery: the callback is
    /// recorded in a processed-callback log keyed by checkout request id inside the same transaction as the
    /// order update, so a replay returns [`CallbackOutcome::AlreadyProcessed`] and changes nothing.
    fn apply_payment_update(&self, update: PaymentUpdate) -> impl Future<Output = Result<CallbackOutcome, MarketplaceError>> + Send;

    //------------------------------------------ Delivery tasks ---------------------------------------------------

    /// Seller acceptance: creates the delivery task and moves the order to AwaitingPickup in one transaction.
    ///
    /// Fails with `Forbidden` when `seller` is not a seller on the order, and with a conflict when the order is
    /// not in the pre-acceptance state or a task already exists — the status guard and the UNIQUE order link
    /// surface as the same benign conflict, never as an internal error.
    fn create_task_for_order(
        &self,
        seller: &UserId,
        order_id: &OrderId,
        task: NewDeliveryTask,
        fees: &DeliveryFees,
    ) -> impl Future<Output = Result<DeliveryTask, MarketplaceError>> + Send;

    fn fetch_task_for_order(&self, order_id: &OrderId) -> impl Future<Output = Result<Option<DeliveryTask>, MarketplaceError>> + Send;

    /// Unclaimed tasks from both channels, oldest first.
    fn available_tasks(&self) -> impl Future<Output = Result<Vec<(DeliveryTask, Money)>, MarketplaceError>> + Send;

    /// The courier's active (AwaitingPickup / InTransit) tasks from both channels.
    fn tasks_for_courier(&self, courier: &UserId) -> impl Future<Output = Result<Vec<(DeliveryTask, Money)>, MarketplaceError>> + Send;

    /// Atomic claim: a single conditional update that assigns the courier iff the task is still unclaimed.
    /// Concurrent claimers get exactly one winner; everyone else sees a conflict.
    fn claim_task(&self, courier: &UserId, task_id: &TaskId) -> impl Future<Output = Result<DeliveryTask, MarketplaceError>> + Send;

    /// Pickup scan: task → InTransit and order → InTransit iff {order, courier, code, status} all match.
    /// Any mismatch is the same opaque [`MarketplaceError::InvalidScan`], deliberately not saying which check
    /// failed.
    fn confirm_pickup(
        &self,
        courier: &UserId,
        order_id: &OrderId,
        code: &str,
    ) -> impl Future<Output = Result<DeliveryTask, MarketplaceError>> + Send;

    /// Delivery scan: task → Delivered, order → Delivered, payment → Released. This is the escrow release.
    fn confirm_delivery(
        &self,
        courier: &UserId,
        order_id: &OrderId,
        code: &str,
    ) -> impl Future<Output = Result<DeliveryTask, MarketplaceError>> + Send;

    /// Completed tasks for the courier's earnings view, newest first.
    fn delivered_tasks_for_courier(&self, courier: &UserId) -> impl Future<Output = Result<Vec<DeliveryTask>, MarketplaceError>> + Send;

    //------------------------------------------ Settlement & side channel ---------------------------------------

    /// Sums funds currently held in escrow. Recomputed on every call.
    fn escrow_summary(&self) -> impl Future<Output = Result<EscrowSummary, MarketplaceError>> + Send;

    fn insert_notification(&self, notification: NewNotification) -> impl Future<Output = Result<(), MarketplaceError>> + Send;

    /// Closes the database connection.
    fn close(&mut self) -> impl Future<Output = Result<(), MarketplaceError>> + Send {
        async { Ok(()) }
    }
}

/// Courier compensation per channel. Bulk consignments pay more.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryFees {
    pub retail: Money,
    pub bulk: Money,
}

impl Default for DeliveryFees {
    fn default() -> Self {
        Self { retail: Money::from(200), bulk: Money::from(500) }
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("{0}")]
    Validation(String),
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested task {0} does not exist")]
    TaskNotFound(TaskId),
    #[error("Not authorized. {0}")]
    Forbidden(String),
    #[error("Order {0} cannot be accepted in its current state")]
    OrderNotAcceptable(OrderId),
    #[error("A delivery task already exists for order {0}")]
    TaskAlreadyExists(OrderId),
    #[error("Task already accepted or does not exist")]
    TaskUnavailable,
    /// Covers every failed pickup/delivery scan: wrong code, wrong courier, wrong status. One error for all
    /// three so a malicious courier cannot use the responses as a code-guessing oracle.
    #[error("Invalid scan, code, or task is not in the right state")]
    InvalidScan,
    #[error("Payment could not be initiated. {0}")]
    GatewayError(String),
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}

impl MarketplaceError {
    /// True for the "benign duplicate" family that callers should treat as an already-processed request.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            MarketplaceError::OrderNotAcceptable(_)
                | MarketplaceError::TaskAlreadyExists(_)
                | MarketplaceError::TaskUnavailable
        )
    }
}
