use serde::{Deserialize, Serialize};

use crate::db_types::{DeliveryTask, Order, UserId};

/// A buyer placed an order and the STK push was accepted. One notification per distinct seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: Order,
    pub sellers: Vec<UserId>,
}

impl OrderPlacedEvent {
    pub fn new(order: Order, sellers: Vec<UserId>) -> Self {
        Self { order, sellers }
    }
}

/// The gateway confirmed payment; funds are now in escrow and the order is ready for seller acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmedEvent {
    pub order: Order,
    pub sellers: Vec<UserId>,
}

/// The gateway reported a payment failure (timeout, cancellation, insufficient funds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub order: Order,
    pub reason: String,
}

/// A seller accepted an order and a delivery task entered the courier pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCreatedEvent {
    pub task: DeliveryTask,
}

/// A courier won the claim on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskClaimedEvent {
    pub task: DeliveryTask,
}

/// The courier scanned the pickup code at the seller's premises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupConfirmedEvent {
    pub task: DeliveryTask,
}

/// The courier scanned the buyer's confirmation code. Escrow has been released to the seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfirmedEvent {
    pub task: DeliveryTask,
}
