//! Delivery-task queries.
//!
//! Retail tasks and bulk consignments live in separate tables with their own counterparty column names. A
//! [`TaskColumns`] mapping carries those names, the SQL is built from the mapping, and every SELECT aliases the
//! per-channel columns back to the [`DeliveryTask`] shape. The state machine is therefore written exactly once
//! and runs unchanged against both tables.
use log::*;
use soko_common::Money;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{DeliveryTask, NewDeliveryTask, Order, OrderId, OrderType, TaskId, UserId},
    sqlite::db::is_unique_violation,
    traits::MarketplaceError,
};

pub struct TaskColumns {
    pub table: &'static str,
    pub order_type: &'static str,
    pub order_link: &'static str,
    pub seller: &'static str,
    pub courier: &'static str,
    pub delivery_code: &'static str,
}

pub const RETAIL_TASKS: TaskColumns = TaskColumns {
    table: "delivery_tasks",
    order_type: "Retail",
    order_link: "order_id",
    seller: "vendor_id",
    courier: "rider_id",
    delivery_code: "buyer_confirmation_code",
};

pub const BULK_TASKS: TaskColumns = TaskColumns {
    table: "bulk_delivery_tasks",
    order_type: "Bulk",
    order_link: "bulk_order_id",
    seller: "seller_id",
    courier: "driver_id",
    delivery_code: "vendor_confirmation_code",
};

const BOTH_CHANNELS: [&TaskColumns; 2] = [&RETAIL_TASKS, &BULK_TASKS];

impl TaskColumns {
    pub fn for_order_type(order_type: OrderType) -> &'static TaskColumns {
        match order_type {
            OrderType::Retail => &RETAIL_TASKS,
            OrderType::Bulk => &BULK_TASKS,
        }
    }

    fn select_list(&self) -> String {
        format!(
            "t.id, '{ot}' AS order_type, t.{link} AS order_id, t.{seller} AS seller_id, t.{courier} AS \
             courier_id, t.status, t.pickup_code, t.{code} AS delivery_confirmation_code, t.street, t.city, \
             t.postal_code, t.country, t.delivery_fee, t.created_at, t.updated_at",
            ot = self.order_type,
            link = self.order_link,
            seller = self.seller,
            courier = self.courier,
            code = self.delivery_code,
        )
    }
}

/// A pool or courier listing row: the task plus the order value the courier will be handling.
#[derive(FromRow)]
struct PooledTask {
    #[sqlx(flatten)]
    task: DeliveryTask,
    total_amount: Money,
}

/// Creates the task for an accepted order. The UNIQUE constraint on the order link is the authority on "at most
/// one task per order"; a violation is reported as [`MarketplaceError::TaskAlreadyExists`].
pub async fn insert_task(
    order: &Order,
    seller: &UserId,
    task: &NewDeliveryTask,
    fee: Money,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    let cols = TaskColumns::for_order_type(order.order_type);
    let q = format!(
        "INSERT INTO {table} (id, {link}, {seller}, pickup_code, {code}, street, city, postal_code, country, \
         delivery_fee) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        table = cols.table,
        link = cols.order_link,
        seller = cols.seller,
        code = cols.delivery_code,
    );
    sqlx::query(&q)
        .bind(&task.id)
        .bind(&order.id)
        .bind(seller)
        .bind(&task.pickup_code)
        .bind(&task.delivery_confirmation_code)
        .bind(&order.shipping_address.street)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.postal_code)
        .bind(&order.shipping_address.country)
        .bind(fee)
        .execute(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                MarketplaceError::TaskAlreadyExists(order.id.clone())
            } else {
                e.into()
            }
        })?;
    debug!("🚚️ Task {} created for order {}", task.id, order.id);
    Ok(())
}

pub async fn fetch_task_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryTask>, MarketplaceError> {
    for cols in BOTH_CHANNELS {
        let q = format!(
            "SELECT {list} FROM {table} t WHERE t.{link} = $1 LIMIT 1",
            list = cols.select_list(),
            table = cols.table,
            link = cols.order_link,
        );
        if let Some(task) = sqlx::query_as::<_, DeliveryTask>(&q).bind(order_id).fetch_optional(&mut *conn).await?
        {
            return Ok(Some(task));
        }
    }
    Ok(None)
}

/// The atomic claim. The conditional update only matches an unclaimed task in the pool state, so under
/// concurrent claimers exactly one update reports a changed row. Returns None when this courier lost (or the
/// task id is unknown).
pub async fn claim_task(
    courier: &UserId,
    task_id: &TaskId,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryTask>, MarketplaceError> {
    for cols in BOTH_CHANNELS {
        let q = format!(
            "UPDATE {table} SET {courier} = $1, status = 'AwaitingPickup', updated_at = CURRENT_TIMESTAMP \
             WHERE id = $2 AND status = 'AwaitingAcceptance' AND {courier} IS NULL",
            table = cols.table,
            courier = cols.courier,
        );
        let claimed = sqlx::query(&q).bind(courier).bind(task_id).execute(&mut *conn).await?.rows_affected();
        if claimed == 1 {
            let q = format!(
                "SELECT {list} FROM {table} t WHERE t.id = $1",
                list = cols.select_list(),
                table = cols.table,
            );
            let task = sqlx::query_as::<_, DeliveryTask>(&q).bind(task_id).fetch_one(&mut *conn).await?;
            info!("🚚️ Courier {courier} claimed task {task_id}");
            return Ok(Some(task));
        }
    }
    Ok(None)
}

/// The pickup scan. All four preconditions (order link, assigned courier, code, status) sit in the WHERE clause;
/// a mismatch on any of them leaves the row untouched and returns None without saying which check failed.
pub async fn confirm_pickup(
    courier: &UserId,
    order_id: &OrderId,
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryTask>, MarketplaceError> {
    for cols in BOTH_CHANNELS {
        let q = format!(
            "UPDATE {table} SET status = 'InTransit', updated_at = CURRENT_TIMESTAMP WHERE {link} = $1 AND \
             {courier} = $2 AND pickup_code = $3 AND status = 'AwaitingPickup'",
            table = cols.table,
            link = cols.order_link,
            courier = cols.courier,
        );
        let n = sqlx::query(&q).bind(order_id).bind(courier).bind(code).execute(&mut *conn).await?.rows_affected();
        if n == 1 {
            let q = format!(
                "SELECT {list} FROM {table} t WHERE t.{link} = $1",
                list = cols.select_list(),
                table = cols.table,
                link = cols.order_link,
            );
            let task = sqlx::query_as::<_, DeliveryTask>(&q).bind(order_id).fetch_one(&mut *conn).await?;
            info!("🚚️ Pickup confirmed for order {order_id}");
            return Ok(Some(task));
        }
    }
    Ok(None)
}

/// The delivery scan, verified against the buyer-held confirmation code. Same opaque-failure contract as
/// [`confirm_pickup`].
pub async fn confirm_delivery(
    courier: &UserId,
    order_id: &OrderId,
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryTask>, MarketplaceError> {
    for cols in BOTH_CHANNELS {
        let q = format!(
            "UPDATE {table} SET status = 'Delivered', updated_at = CURRENT_TIMESTAMP WHERE {link} = $1 AND \
             {courier} = $2 AND {code} = $3 AND status = 'InTransit'",
            table = cols.table,
            link = cols.order_link,
            courier = cols.courier,
            code = cols.delivery_code,
        );
        let n = sqlx::query(&q).bind(order_id).bind(courier).bind(code).execute(&mut *conn).await?.rows_affected();
        if n == 1 {
            let q = format!(
                "SELECT {list} FROM {table} t WHERE t.{link} = $1",
                list = cols.select_list(),
                table = cols.table,
                link = cols.order_link,
            );
            let task = sqlx::query_as::<_, DeliveryTask>(&q).bind(order_id).fetch_one(&mut *conn).await?;
            info!("🚚️ Delivery confirmed for order {order_id}");
            return Ok(Some(task));
        }
    }
    Ok(None)
}

/// Unclaimed tasks from both channels, oldest first, each with the order value attached.
pub async fn available_tasks(
    conn: &mut SqliteConnection,
) -> Result<Vec<(DeliveryTask, Money)>, MarketplaceError> {
    let mut result = Vec::new();
    for cols in BOTH_CHANNELS {
        let q = format!(
            "SELECT {list}, o.total_amount AS total_amount FROM {table} t JOIN orders o ON o.id = t.{link} \
             WHERE t.status = 'AwaitingAcceptance' ORDER BY t.created_at ASC",
            list = cols.select_list(),
            table = cols.table,
            link = cols.order_link,
        );
        let rows: Vec<PooledTask> = sqlx::query_as(&q).fetch_all(&mut *conn).await?;
        result.extend(rows.into_iter().map(|r| (r.task, r.total_amount)));
    }
    result.sort_by(|a, b| a.0.created_at.cmp(&b.0.created_at));
    Ok(result)
}

/// The courier's claimed-but-not-delivered tasks from both channels, newest first.
pub async fn active_tasks_for_courier(
    courier: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<(DeliveryTask, Money)>, MarketplaceError> {
    let mut result = Vec::new();
    for cols in BOTH_CHANNELS {
        let q = format!(
            "SELECT {list}, o.total_amount AS total_amount FROM {table} t JOIN orders o ON o.id = t.{link} \
             WHERE t.{courier} = $1 AND t.status IN ('AwaitingPickup', 'InTransit') ORDER BY t.created_at DESC",
            list = cols.select_list(),
            table = cols.table,
            link = cols.order_link,
            courier = cols.courier,
        );
        let rows: Vec<PooledTask> = sqlx::query_as(&q).bind(courier).fetch_all(&mut *conn).await?;
        result.extend(rows.into_iter().map(|r| (r.task, r.total_amount)));
    }
    result.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));
    Ok(result)
}

/// Completed tasks for the earnings view, newest first.
pub async fn delivered_tasks_for_courier(
    courier: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<DeliveryTask>, MarketplaceError> {
    let mut result = Vec::new();
    for cols in BOTH_CHANNELS {
        let q = format!(
            "SELECT {list} FROM {table} t WHERE t.{courier} = $1 AND t.status = 'Delivered' ORDER BY \
             t.updated_at DESC",
            list = cols.select_list(),
            table = cols.table,
            courier = cols.courier,
        );
        let rows: Vec<DeliveryTask> = sqlx::query_as(&q).bind(courier).fetch_all(&mut *conn).await?;
        result.extend(rows);
    }
    result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(result)
}
