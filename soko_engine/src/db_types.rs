use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soko_common::Money;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------        OrderId        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The short, human-friendly form used in notification copy. Matches the last 6 characters, uppercased.
    pub fn short(&self) -> String {
        let n = self.0.len().saturating_sub(6);
        self.0[n..].to_uppercase()
    }
}

//--------------------------------------        TaskId         -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct TaskId(pub String);

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        UserId         -------------------------------------------------------
/// An opaque user identifier. Authentication is handled upstream; the engine trusts ids handed to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct UserId(pub String);

impl<S: Into<String>> From<S> for UserId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      OrderType        -------------------------------------------------------
/// The two marketplace channels. Retail is buyer→vendor (B2C), Bulk is vendor→farmer (B2B). Both run the same
/// state machine; tasks are stored per-channel with their own counterparty field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderType {
    Retail,
    Bulk,
}

impl Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Retail => write!(f, "Retail"),
            OrderType::Bulk => write!(f, "Bulk"),
        }
    }
}

impl FromStr for OrderType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Retail" => Ok(Self::Retail),
            "Bulk" => Ok(Self::Bulk),
            s => Err(ConversionError(format!("Invalid order type: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus      -------------------------------------------------------
/// Where the buyer's money is. `Held` covers the entire escrow window, from M-Pesa confirmation until the rider
/// scans the delivery code, at which point the order moves to `Released`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// An STK push has been sent to the buyer's phone and we are waiting on the gateway callback.
    Pending,
    /// Payment confirmed by the gateway. Funds are in escrow pending delivery.
    Held,
    /// Delivery was confirmed and the escrowed funds belong to the seller.
    Released,
    /// The gateway reported a failure (timeout, insufficient funds, user cancelled).
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Held => write!(f, "Held"),
            PaymentStatus::Released => write!(f, "Released"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Held" => Ok(Self::Held),
            "Released" => Ok(Self::Released),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------     OrderStatus       -------------------------------------------------------
/// The order lifecycle. Transitions only ever move forward:
/// `Processing → Confirmed → AwaitingPickup → InTransit → Delivered`, with `Cancelled` reachable from any
/// pre-Delivered state. Delivered and Cancelled are mutually exclusive terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Just placed; payment outcome unknown.
    Processing,
    /// Payment is in escrow; waiting for the seller to accept.
    Confirmed,
    /// Seller accepted and a delivery task exists; waiting for a courier pickup scan.
    AwaitingPickup,
    InTransit,
    Delivered,
    Cancelled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Processing => write!(f, "Processing"),
            OrderStatus::Confirmed => write!(f, "Confirmed"),
            OrderStatus::AwaitingPickup => write!(f, "AwaitingPickup"),
            OrderStatus::InTransit => write!(f, "InTransit"),
            OrderStatus::Delivered => write!(f, "Delivered"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Processing" => Ok(Self::Processing),
            "Confirmed" => Ok(Self::Confirmed),
            "AwaitingPickup" => Ok(Self::AwaitingPickup),
            "InTransit" => Ok(Self::InTransit),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------      TaskStatus       -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Visible in the courier pool; no courier assigned yet.
    AwaitingAcceptance,
    /// Claimed by a courier who has not scanned the pickup code yet.
    AwaitingPickup,
    InTransit,
    Delivered,
    Cancelled,
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::AwaitingAcceptance => write!(f, "AwaitingAcceptance"),
            TaskStatus::AwaitingPickup => write!(f, "AwaitingPickup"),
            TaskStatus::InTransit => write!(f, "InTransit"),
            TaskStatus::Delivered => write!(f, "Delivered"),
            TaskStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AwaitingAcceptance" => Ok(Self::AwaitingAcceptance),
            "AwaitingPickup" => Ok(Self::AwaitingPickup),
            "InTransit" => Ok(Self::InTransit),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid task status: {s}"))),
        }
    }
}

//--------------------------------------   ShippingAddress     -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    pub fn is_complete(&self) -> bool {
        !(self.street.trim().is_empty()
            || self.city.trim().is_empty()
            || self.postal_code.trim().is_empty()
            || self.country.trim().is_empty())
    }
}

impl Display for ShippingAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.street, self.city)
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_type: OrderType,
    pub buyer_id: UserId,
    pub total_amount: Money,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    /// The gateway's correlation handle, set at initiation and matched against the asynchronous callback.
    pub checkout_request_id: String,
    pub payer_phone: String,
    pub receipt_number: Option<String>,
    pub payment_failure_reason: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderItem        -------------------------------------------------------
/// A line item with the unit price snapshotted at placement time. Catalog edits never touch placed orders.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub seller_id: UserId,
}

//--------------------------------------       NewOrder        -------------------------------------------------------
/// A fully validated, priced order ready to be persisted. Built by [`crate::OrderFlowApi::place_order`] after
/// the catalog lookup and the synchronous gateway handshake have both succeeded.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub order_type: OrderType,
    pub buyer_id: UserId,
    pub items: Vec<NewOrderItem>,
    pub total_amount: Money,
    pub shipping_address: ShippingAddress,
    pub payer_phone: String,
    pub checkout_request_id: String,
}

impl NewOrder {
    /// The distinct sellers referenced by this order, in first-appearance order.
    pub fn sellers(&self) -> Vec<UserId> {
        let mut sellers = Vec::new();
        for item in &self.items {
            if !sellers.contains(&item.seller_id) {
                sellers.push(item.seller_id.clone());
            }
        }
        sellers
    }
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub seller_id: UserId,
}

//--------------------------------------     DeliveryTask      -------------------------------------------------------
/// The delivery assignment for an accepted order. Retail tasks and bulk tasks live in separate tables with the
/// channel's own counterparty names (vendor/rider vs seller/driver); the storage layer normalises both into this
/// shape so the dispatch logic exists exactly once.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryTask {
    pub id: TaskId,
    pub order_type: OrderType,
    pub order_id: OrderId,
    pub seller_id: UserId,
    /// Null until exactly one courier wins the claim; fixed thereafter.
    pub courier_id: Option<UserId>,
    pub status: TaskStatus,
    /// Shown at the seller's premises, scanned by the courier to prove legitimate collection.
    pub pickup_code: String,
    /// Known to the buyer, scanned by the courier at handoff. Scanning it releases escrow.
    pub delivery_confirmation_code: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub delivery_address: ShippingAddress,
    pub delivery_fee: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The freshly generated identity and secrets for a task being created by seller acceptance.
#[derive(Debug, Clone)]
pub struct NewDeliveryTask {
    pub id: TaskId,
    pub pickup_code: String,
    pub delivery_confirmation_code: String,
}

//--------------------------------------       Product         -------------------------------------------------------
/// The slice of the catalog the engine reads at placement time. Catalog management is a separate system; this is
/// its read contract.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub unit_price: Money,
    pub seller_id: UserId,
    pub order_type: OrderType,
}

//--------------------------------------    PaymentUpdate      -------------------------------------------------------
/// The storage-facing distillation of an STK callback. `result_code` zero means the money is in.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub checkout_request_id: String,
    pub result_code: i64,
    pub result_desc: String,
    pub receipt_number: Option<String>,
    pub transaction_date: Option<String>,
    pub phone_number: Option<String>,
}

impl PaymentUpdate {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }
}

//--------------------------------------   CallbackOutcome     -------------------------------------------------------
/// What applying a payment callback did. The webhook route always returns 200; this is for logging and events.
#[derive(Debug, Clone)]
pub enum CallbackOutcome {
    /// First delivery of this callback; the order was updated.
    Applied { order: Order, success: bool },
    /// The gateway re-delivered a callback we have already processed. No state was changed.
    AlreadyProcessed,
    /// No order matches the checkout request id. Logged and dropped.
    OrderNotFound,
}

//--------------------------------------    EscrowSummary      -------------------------------------------------------
/// Funds currently held: paid-for orders that have not reached a terminal state. Computed on demand, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct EscrowSummary {
    pub total: Money,
    pub order_count: i64,
}

//--------------------------------------   NewNotification     -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient: UserId,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub related_id: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_strings_roundtrip() {
        for s in
            [OrderStatus::Processing, OrderStatus::Confirmed, OrderStatus::AwaitingPickup, OrderStatus::InTransit, OrderStatus::Delivered, OrderStatus::Cancelled]
        {
            assert_eq!(s.to_string().parse::<OrderStatus>().unwrap(), s);
        }
        for s in [PaymentStatus::Pending, PaymentStatus::Held, PaymentStatus::Released, PaymentStatus::Failed] {
            assert_eq!(s.to_string().parse::<PaymentStatus>().unwrap(), s);
        }
        for s in [
            TaskStatus::AwaitingAcceptance,
            TaskStatus::AwaitingPickup,
            TaskStatus::InTransit,
            TaskStatus::Delivered,
            TaskStatus::Cancelled,
        ] {
            assert_eq!(s.to_string().parse::<TaskStatus>().unwrap(), s);
        }
        assert!("QR Scanning".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn short_order_ids() {
        let id = OrderId("ord-9f2c41d7a8b3".into());
        assert_eq!(id.short(), "D7A8B3");
    }
}
