//! Courier-facing projections of [`DeliveryTask`].
//!
//! The raw task row carries both handoff secrets. Couriers must *collect* those codes in the real world (the
//! pickup QR at the premises, the buyer's spoken code at the door), so none of the views here include either.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soko_common::Money;

use crate::db_types::{DeliveryTask, OrderId, OrderType, ShippingAddress, TaskId, TaskStatus, UserId};

/// One entry in the open pool, as shown to any courier browsing for work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub order_type: OrderType,
    pub order_id: OrderId,
    pub seller_id: UserId,
    pub delivery_address: ShippingAddress,
    pub order_value: Money,
    pub delivery_fee: Money,
    pub created_at: DateTime<Utc>,
}

impl TaskSummary {
    pub fn new(task: DeliveryTask, order_value: Money) -> Self {
        Self {
            id: task.id,
            order_type: task.order_type,
            order_id: task.order_id,
            seller_id: task.seller_id,
            delivery_address: task.delivery_address,
            order_value,
            delivery_fee: task.delivery_fee,
            created_at: task.created_at,
        }
    }
}

/// An active assignment as shown to the courier who holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierTask {
    pub id: TaskId,
    pub order_type: OrderType,
    pub order_id: OrderId,
    pub seller_id: UserId,
    pub status: TaskStatus,
    pub delivery_address: ShippingAddress,
    pub order_value: Money,
    pub delivery_fee: Money,
    pub created_at: DateTime<Utc>,
}

impl CourierTask {
    pub fn new(task: DeliveryTask, order_value: Money) -> Self {
        Self {
            id: task.id,
            order_type: task.order_type,
            order_id: task.order_id,
            seller_id: task.seller_id,
            status: task.status,
            delivery_address: task.delivery_address,
            order_value,
            delivery_fee: task.delivery_fee,
            created_at: task.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedDelivery {
    pub id: TaskId,
    pub order_type: OrderType,
    pub order_id: OrderId,
    pub delivery_fee: Money,
    pub delivered_at: DateTime<Utc>,
}

impl From<DeliveryTask> for CompletedDelivery {
    fn from(task: DeliveryTask) -> Self {
        Self {
            id: task.id,
            order_type: task.order_type,
            order_id: task.order_id,
            delivery_fee: task.delivery_fee,
            delivered_at: task.updated_at,
        }
    }
}

/// The courier's earnings ledger: completed deliveries, newest first, plus the fee total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierEarnings {
    pub total_earned: Money,
    pub delivery_count: usize,
    pub deliveries: Vec<CompletedDelivery>,
}
