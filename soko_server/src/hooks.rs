//! Notification side channel.
//!
//! The engine publishes an event at every fulfilment transition. These hooks turn those events into rows in the
//! notification feed, which is how buyers, sellers and riders find out what happened without the core ever
//! knowing about notification UX. A lost notification is annoying but harmless, so failures here are logged and
//! swallowed rather than bubbled into the transition that triggered them.
use log::*;
use soko_engine::{
    db_types::{NewNotification, Order, OrderId, UserId},
    events::EventHooks,
    MarketplaceDatabase,
    NotificationApi,
};

pub fn create_notification_hooks<B>(db: B) -> EventHooks
where B: MarketplaceDatabase + Send + Sync + 'static {
    let mut hooks = EventHooks::default();

    let api = NotificationApi::new(db.clone());
    hooks.on_order_placed(move |ev| {
        let api = api.clone();
        Box::pin(async move {
            for seller in ev.sellers {
                let n = notification(
                    seller,
                    "order_placed",
                    "New order",
                    format!("Order #{} has been placed and is awaiting payment.", ev.order.id.short()),
                    &ev.order.id,
                );
                store(&api, n).await;
            }
        })
    });

    let api = NotificationApi::new(db.clone());
    hooks.on_payment_confirmed(move |ev| {
        let api = api.clone();
        Box::pin(async move {
            let n = notification(
                ev.order.buyer_id.clone(),
                "payment_received",
                "Payment received",
                format!(
                    "We received your payment of {} for order #{}. It is held in escrow until you confirm \
                     delivery.",
                    ev.order.total_amount,
                    ev.order.id.short()
                ),
                &ev.order.id,
            );
            store(&api, n).await;
            for seller in ev.sellers {
                let n = notification(
                    seller,
                    "order_paid",
                    "Order paid",
                    format!("Order #{} has been paid. Accept it to start delivery.", ev.order.id.short()),
                    &ev.order.id,
                );
                store(&api, n).await;
            }
        })
    });

    let api = NotificationApi::new(db.clone());
    hooks.on_payment_failed(move |ev| {
        let api = api.clone();
        Box::pin(async move {
            let n = notification(
                ev.order.buyer_id.clone(),
                "payment_failed",
                "Payment failed",
                format!("{} We did not receive payment for order #{}.", ev.reason, ev.order.id.short()),
                &ev.order.id,
            );
            store(&api, n).await;
        })
    });

    let api = NotificationApi::new(db.clone());
    hooks.on_task_created(move |ev| {
        let api = api.clone();
        Box::pin(async move {
            let n = notification(
                ev.task.seller_id.clone(),
                "task_created",
                "Delivery requested",
                format!("Order #{} is in the courier pool. Keep the pickup code ready.", ev.task.order_id.short()),
                &ev.task.order_id,
            );
            store(&api, n).await;
        })
    });

    let api = NotificationApi::new(db.clone());
    hooks.on_task_claimed(move |ev| {
        let api = api.clone();
        Box::pin(async move {
            let n = notification(
                ev.task.seller_id.clone(),
                "task_claimed",
                "Courier assigned",
                format!("A courier is on the way to collect order #{}.", ev.task.order_id.short()),
                &ev.task.order_id,
            );
            store(&api, n).await;
        })
    });

    let lookup = db.clone();
    let api = NotificationApi::new(db.clone());
    hooks.on_pickup_confirmed(move |ev| {
        let api = api.clone();
        let db = lookup.clone();
        Box::pin(async move {
            let Some(order) = fetch_order(&db, &ev.task.order_id).await else { return };
            let n = notification(
                order.buyer_id,
                "order_in_transit",
                "Your order is on its way",
                format!(
                    "Order #{} has been collected. Give the courier your confirmation code at handoff.",
                    ev.task.order_id.short()
                ),
                &ev.task.order_id,
            );
            store(&api, n).await;
        })
    });

    let lookup = db.clone();
    let api = NotificationApi::new(db);
    hooks.on_delivery_confirmed(move |ev| {
        let api = api.clone();
        let db = lookup.clone();
        Box::pin(async move {
            let n = notification(
                ev.task.seller_id.clone(),
                "payment_released",
                "Payment released",
                format!("Order #{} was delivered and the escrowed payment is yours.", ev.task.order_id.short()),
                &ev.task.order_id,
            );
            store(&api, n).await;
            let Some(order) = fetch_order(&db, &ev.task.order_id).await else { return };
            let n = notification(
                order.buyer_id,
                "order_delivered",
                "Order delivered",
                format!("Order #{} has been delivered. Thank you for shopping with Soko.", ev.task.order_id.short()),
                &ev.task.order_id,
            );
            store(&api, n).await;
        })
    });

    hooks
}

fn notification(
    recipient: UserId,
    notification_type: &str,
    title: &str,
    message: String,
    order_id: &OrderId,
) -> NewNotification {
    NewNotification {
        recipient,
        notification_type: notification_type.to_string(),
        title: title.to_string(),
        message,
        related_id: order_id.as_str().to_string(),
    }
}

async fn store<B: MarketplaceDatabase>(api: &NotificationApi<B>, n: NewNotification) {
    if let Err(e) = api.notify(n).await {
        error!("📨️ Could not persist notification: {e}");
    }
}

async fn fetch_order<B: MarketplaceDatabase>(db: &B, order_id: &OrderId) -> Option<Order> {
    match db.fetch_order(order_id).await {
        Ok(Some(order)) => Some(order),
        Ok(None) => {
            warn!("📨️ Order {order_id} not found while building a notification");
            None
        },
        Err(e) => {
            error!("📨️ Could not load order {order_id} for a notification: {e}");
            None
        },
    }
}
