use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{EscrowSummary, NewOrder, Order, OrderId, OrderItem, OrderStatus, UserId},
    traits::MarketplaceError,
};

pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    sqlx::query(
        r#"INSERT INTO orders
        (id, order_type, buyer_id, total_amount, checkout_request_id, payer_phone, street, city, postal_code, country)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
    )
    .bind(&order.id)
    .bind(order.order_type)
    .bind(&order.buyer_id)
    .bind(order.total_amount)
    .bind(&order.checkout_request_id)
    .bind(&order.payer_phone)
    .bind(&order.shipping_address.street)
    .bind(&order.shipping_address.city)
    .bind(&order.shipping_address.postal_code)
    .bind(&order.shipping_address.country)
    .execute(&mut *conn)
    .await?;
    for item in &order.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, name, quantity, unit_price, seller_id) VALUES ($1, \
             $2, $3, $4, $5, $6)",
        )
        .bind(&order.id)
        .bind(&item.product_id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(&item.seller_id)
        .execute(&mut *conn)
        .await?;
    }
    debug!("🛒️ Order {} saved with {} line item(s)", order.id, order.items.len());
    Ok(())
}

pub async fn fetch_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 LIMIT 1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_checkout_id(
    checkout_request_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE checkout_request_id = $1 LIMIT 1")
        .bind(checkout_request_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_items(
    id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, MarketplaceError> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT order_id, product_id, name, quantity, unit_price, seller_id FROM order_items WHERE order_id = $1",
    )
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

pub async fn fetch_orders_for_buyer(
    buyer: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, MarketplaceError> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC")
        .bind(buyer)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_orders_for_seller(
    seller: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, MarketplaceError> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT DISTINCT o.* FROM orders o JOIN order_items i ON i.order_id = o.id WHERE i.seller_id = $1 ORDER \
         BY o.created_at DESC",
    )
    .bind(seller)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Marks the order paid. The `payment_status = 'Pending'` guard makes this a no-op (None) on anything but the
/// first applicable callback.
pub async fn set_payment_success(
    id: &OrderId,
    receipt: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET payment_status = 'Held', order_status = 'Confirmed', receipt_number = $2, updated_at \
         = CURRENT_TIMESTAMP WHERE id = $1 AND payment_status = 'Pending' RETURNING *",
    )
    .bind(id)
    .bind(receipt)
    .fetch_optional(conn)
    .await?;
    if let Some(o) = &order {
        debug!("🛒️ Payment for order {} confirmed. Funds are in escrow.", o.id);
    }
    Ok(order)
}

/// Records a failed payment. Only the payment side changes; the order status is left where it was so the buyer
/// can settle the order with a fresh payment attempt.
pub async fn set_payment_failure(
    id: &OrderId,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET payment_status = 'Failed', payment_failure_reason = $2, updated_at = \
         CURRENT_TIMESTAMP WHERE id = $1 AND payment_status = 'Pending' RETURNING *",
    )
    .bind(id)
    .bind(reason)
    .fetch_optional(conn)
    .await?;
    if let Some(o) = &order {
        debug!("🛒️ Payment for order {} failed: {reason}", o.id);
    }
    Ok(order)
}

/// The seller-acceptance half of the order record: Confirmed → AwaitingPickup, and only while the funds are
/// actually in escrow. Returns None when the order is in any other state.
pub async fn begin_fulfilment(
    id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET order_status = 'AwaitingPickup', updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND \
         order_status = 'Confirmed' AND payment_status = 'Held' RETURNING *",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// A guarded forward step in the order lifecycle. Returns None when the order is not in `from`.
pub async fn advance_order_status(
    id: &OrderId,
    from: OrderStatus,
    to: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET order_status = $3, updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND order_status = \
         $2 RETURNING *",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// The escrow release. Only fires while the funds are Held, so a replayed delivery scan cannot release twice.
pub async fn release_escrow(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, MarketplaceError> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET payment_status = 'Released', order_status = 'Delivered', updated_at = \
         CURRENT_TIMESTAMP WHERE id = $1 AND payment_status = 'Held' RETURNING *",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    if let Some(o) = &order {
        info!("🛒️ Escrow of {} released for order {}", o.total_amount, o.id);
    }
    Ok(order)
}

pub async fn escrow_summary(conn: &mut SqliteConnection) -> Result<EscrowSummary, MarketplaceError> {
    let summary = sqlx::query_as::<_, EscrowSummary>(
        "SELECT COALESCE(SUM(total_amount), 0) AS total, COUNT(*) AS order_count FROM orders WHERE \
         payment_status = 'Held' AND order_status NOT IN ('Delivered', 'Cancelled')",
    )
    .fetch_one(conn)
    .await?;
    Ok(summary)
}
