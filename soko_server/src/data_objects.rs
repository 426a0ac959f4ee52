use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soko_common::Money;
use soko_engine::{
    db_types::{DeliveryTask, Order, OrderId, OrderItem, OrderType, ShippingAddress, TaskId, TaskStatus, UserId},
    CartItem,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderRequest {
    pub items: Vec<CartItem>,
    pub phone_number: String,
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self { success: false, message: message.into() }
    }
}

/// A role-filtered projection of a delivery task. Each handoff code is only serialized for the party that is
/// supposed to present it: the pickup code for the seller, the confirmation code for the buyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub order_type: OrderType,
    pub order_id: OrderId,
    pub seller_id: UserId,
    pub courier_id: Option<UserId>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_confirmation_code: Option<String>,
    pub delivery_address: ShippingAddress,
    pub delivery_fee: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    fn new(task: DeliveryTask, pickup: bool, delivery: bool) -> Self {
        Self {
            pickup_code: pickup.then_some(task.pickup_code),
            delivery_confirmation_code: delivery.then_some(task.delivery_confirmation_code),
            id: task.id,
            order_type: task.order_type,
            order_id: task.order_id,
            seller_id: task.seller_id,
            courier_id: task.courier_id,
            status: task.status,
            delivery_address: task.delivery_address,
            delivery_fee: task.delivery_fee,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }

    pub fn for_buyer(task: DeliveryTask) -> Self {
        Self::new(task, false, true)
    }

    pub fn for_seller(task: DeliveryTask) -> Self {
        Self::new(task, true, false)
    }

    pub fn for_admin(task: DeliveryTask) -> Self {
        Self::new(task, true, true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskView>,
}
