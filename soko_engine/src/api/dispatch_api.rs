use log::*;
use soko_common::Money;

use crate::{
    api::task_objects::{CompletedDelivery, CourierEarnings, CourierTask, TaskSummary},
    db_types::{DeliveryTask, NewDeliveryTask, OrderId, TaskId, UserId},
    events::{DeliveryConfirmedEvent, EventProducers, PickupConfirmedEvent, TaskClaimedEvent, TaskCreatedEvent},
    helpers,
    traits::{DeliveryFees, MarketplaceDatabase, MarketplaceError},
};

/// `DispatchApi` covers everything that happens after payment lands in escrow: seller acceptance (which mints
/// the delivery task and both handoff codes), the open courier pool, the atomic claim, and the two code-verified
/// scans.
#[derive(Clone)]
pub struct DispatchApi<B> {
    db: B,
    fees: DeliveryFees,
    producers: EventProducers,
}

impl<B> DispatchApi<B>
where B: MarketplaceDatabase
{
    pub fn new(db: B, fees: DeliveryFees, producers: EventProducers) -> Self {
        Self { db, fees, producers }
    }

    /// Seller acceptance. Generates the task identity and both codes, then hands the whole transition (guarded
    /// order update + task insert) to the backend as one transaction. The returned task carries the pickup code
    /// for the seller to display.
    pub async fn accept_order(&self, seller: &UserId, order_id: &OrderId) -> Result<DeliveryTask, MarketplaceError> {
        let new_task = NewDeliveryTask {
            id: helpers::new_task_id(),
            pickup_code: helpers::new_pickup_code(),
            delivery_confirmation_code: helpers::new_delivery_code(),
        };
        let task = self.db.create_task_for_order(seller, order_id, new_task, &self.fees).await?;
        info!("🚚️ Order {order_id} accepted by {seller}. Task {} is in the pool.", task.id);
        for producer in &self.producers.task_created_producer {
            producer.publish_event(TaskCreatedEvent { task: task.clone() }).await;
        }
        Ok(task)
    }

    pub async fn available_tasks(&self) -> Result<Vec<TaskSummary>, MarketplaceError> {
        let tasks = self.db.available_tasks().await?;
        Ok(tasks.into_iter().map(|(task, value)| TaskSummary::new(task, value)).collect())
    }

    pub async fn tasks_for_courier(&self, courier: &UserId) -> Result<Vec<CourierTask>, MarketplaceError> {
        let tasks = self.db.tasks_for_courier(courier).await?;
        Ok(tasks.into_iter().map(|(task, value)| CourierTask::new(task, value)).collect())
    }

    /// Claims a pool task for `courier`. Exactly one concurrent claimer wins; the rest get
    /// [`MarketplaceError::TaskUnavailable`].
    pub async fn claim_task(&self, courier: &UserId, task_id: &TaskId) -> Result<DeliveryTask, MarketplaceError> {
        let task = self.db.claim_task(courier, task_id).await?;
        for producer in &self.producers.task_claimed_producer {
            producer.publish_event(TaskClaimedEvent { task: task.clone() }).await;
        }
        Ok(task)
    }

    /// The pickup scan. Fails with the same opaque error whether the code, the courier or the state is wrong.
    pub async fn confirm_pickup(
        &self,
        courier: &UserId,
        order_id: &OrderId,
        code: &str,
    ) -> Result<DeliveryTask, MarketplaceError> {
        let task = self.db.confirm_pickup(courier, order_id, code).await?;
        for producer in &self.producers.pickup_confirmed_producer {
            producer.publish_event(PickupConfirmedEvent { task: task.clone() }).await;
        }
        Ok(task)
    }

    /// The delivery scan. On success the escrowed funds have been released to the seller.
    pub async fn confirm_delivery(
        &self,
        courier: &UserId,
        order_id: &OrderId,
        code: &str,
    ) -> Result<DeliveryTask, MarketplaceError> {
        let task = self.db.confirm_delivery(courier, order_id, code).await?;
        for producer in &self.producers.delivery_confirmed_producer {
            producer.publish_event(DeliveryConfirmedEvent { task: task.clone() }).await;
        }
        Ok(task)
    }

    pub async fn task_for_order(&self, order_id: &OrderId) -> Result<Option<DeliveryTask>, MarketplaceError> {
        self.db.fetch_task_for_order(order_id).await
    }

    pub async fn earnings_for_courier(&self, courier: &UserId) -> Result<CourierEarnings, MarketplaceError> {
        let tasks = self.db.delivered_tasks_for_courier(courier).await?;
        let total_earned: Money = tasks.iter().map(|t| t.delivery_fee).sum();
        let deliveries: Vec<CompletedDelivery> = tasks.into_iter().map(CompletedDelivery::from).collect();
        Ok(CourierEarnings { total_earned, delivery_count: deliveries.len(), deliveries })
    }
}
