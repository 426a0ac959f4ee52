use log::*;
use soko_common::Money;
use sqlx::SqlitePool;

use crate::{
    db_types::{
        CallbackOutcome,
        DeliveryTask,
        EscrowSummary,
        NewDeliveryTask,
        NewNotification,
        NewOrder,
        Order,
        OrderId,
        OrderItem,
        OrderStatus,
        OrderType,
        PaymentUpdate,
        Product,
        TaskId,
        UserId,
    },
    sqlite::db::{self, notifications, orders, payments, products, tasks},
    traits::{DeliveryFees, MarketplaceDatabase, MarketplaceError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase").field("url", &self.url).finish()
    }
}

impl SqliteDatabase {
    /// Connects to the database given by the `SOKO_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, MarketplaceError> {
        let url = db::db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, MarketplaceError> {
        let pool = db::new_pool(url, max_connections).await?;
        debug!("🗃️️ Connected to database {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product(product_id, &mut conn).await
    }

    async fn upsert_product(&self, product: Product) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        products::upsert_product(&product, &mut conn).await
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        orders::insert_order(&order, &mut tx).await?;
        let saved = orders::fetch_order(&order.id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::DatabaseError(format!("Order {} vanished after insert", order.id)))?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_items(id, &mut conn).await
    }

    async fn fetch_orders_for_buyer(&self, buyer: &UserId) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_buyer(buyer, &mut conn).await
    }

    async fn fetch_orders_for_seller(&self, seller: &UserId) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_seller(seller, &mut conn).await
    }

    async fn apply_payment_update(&self, update: PaymentUpdate) -> Result<CallbackOutcome, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::fetch_order_by_checkout_id(&update.checkout_request_id, &mut tx).await? else {
            warn!("💰️ No order matches checkout request {}. Ignoring callback.", update.checkout_request_id);
            return Ok(CallbackOutcome::OrderNotFound);
        };
        let first_delivery = payments::record_callback(&update, &mut tx).await?;
        if !first_delivery {
            tx.commit().await?;
            return Ok(CallbackOutcome::AlreadyProcessed);
        }
        let updated = if update.is_success() {
            orders::set_payment_success(&order.id, update.receipt_number.as_deref(), &mut tx).await?
        } else {
            orders::set_payment_failure(&order.id, &update.result_desc, &mut tx).await?
        };
        tx.commit().await?;
        match updated {
            Some(order) => Ok(CallbackOutcome::Applied { order, success: update.is_success() }),
            // The log entry was new but the order had already left Pending. Nothing to do.
            None => Ok(CallbackOutcome::AlreadyProcessed),
        }
    }

    async fn create_task_for_order(
        &self,
        seller: &UserId,
        order_id: &OrderId,
        task: NewDeliveryTask,
        fees: &DeliveryFees,
    ) -> Result<DeliveryTask, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        // The guarded update must be the transaction's first statement. Concurrent acceptances then serialize
        // on the write lock, and the loser's update matches no row instead of failing with a lock error. The
        // transaction rolls back on any later error, undoing the status change.
        let Some(order) = orders::begin_fulfilment(order_id, &mut tx).await? else {
            return match orders::fetch_order(order_id, &mut tx).await? {
                Some(_) => Err(MarketplaceError::OrderNotAcceptable(order_id.clone())),
                None => Err(MarketplaceError::OrderNotFound(order_id.clone())),
            };
        };
        let items = orders::fetch_order_items(order_id, &mut tx).await?;
        if !items.iter().any(|i| &i.seller_id == seller) {
            return Err(MarketplaceError::Forbidden(format!(
                "User {seller} does not sell anything on order {order_id}"
            )));
        }
        let fee = match order.order_type {
            OrderType::Retail => fees.retail,
            OrderType::Bulk => fees.bulk,
        };
        tasks::insert_task(&order, seller, &task, fee, &mut tx).await?;
        let created = tasks::fetch_task_for_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::DatabaseError(format!("Task for {order_id} vanished after insert")))?;
        tx.commit().await?;
        Ok(created)
    }

    async fn fetch_task_for_order(&self, order_id: &OrderId) -> Result<Option<DeliveryTask>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        tasks::fetch_task_for_order(order_id, &mut conn).await
    }

    async fn available_tasks(&self) -> Result<Vec<(DeliveryTask, Money)>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        tasks::available_tasks(&mut conn).await
    }

    async fn tasks_for_courier(&self, courier: &UserId) -> Result<Vec<(DeliveryTask, Money)>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        tasks::active_tasks_for_courier(courier, &mut conn).await
    }

    async fn claim_task(&self, courier: &UserId, task_id: &TaskId) -> Result<DeliveryTask, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        tasks::claim_task(courier, task_id, &mut conn).await?.ok_or(MarketplaceError::TaskUnavailable)
    }

    async fn confirm_pickup(
        &self,
        courier: &UserId,
        order_id: &OrderId,
        code: &str,
    ) -> Result<DeliveryTask, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let task = tasks::confirm_pickup(courier, order_id, code, &mut tx)
            .await?
            .ok_or(MarketplaceError::InvalidScan)?;
        orders::advance_order_status(order_id, OrderStatus::AwaitingPickup, OrderStatus::InTransit, &mut tx)
            .await?
            .ok_or(MarketplaceError::InvalidScan)?;
        tx.commit().await?;
        Ok(task)
    }

    async fn confirm_delivery(
        &self,
        courier: &UserId,
        order_id: &OrderId,
        code: &str,
    ) -> Result<DeliveryTask, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let task = tasks::confirm_delivery(courier, order_id, code, &mut tx)
            .await?
            .ok_or(MarketplaceError::InvalidScan)?;
        orders::release_escrow(order_id, &mut tx).await?.ok_or(MarketplaceError::InvalidScan)?;
        tx.commit().await?;
        Ok(task)
    }

    async fn delivered_tasks_for_courier(&self, courier: &UserId) -> Result<Vec<DeliveryTask>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        tasks::delivered_tasks_for_courier(courier, &mut conn).await
    }

    async fn escrow_summary(&self) -> Result<EscrowSummary, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        orders::escrow_summary(&mut conn).await
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        notifications::insert_notification(&notification, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}
