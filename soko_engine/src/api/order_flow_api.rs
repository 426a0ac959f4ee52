use log::*;
use serde::{Deserialize, Serialize};
use soko_common::Money;

use crate::{
    db_types::{
        CallbackOutcome,
        NewOrder,
        NewOrderItem,
        Order,
        OrderId,
        OrderItem,
        OrderType,
        PaymentUpdate,
        ShippingAddress,
        UserId,
    },
    events::{EventProducers, OrderPlacedEvent, PaymentConfirmedEvent, PaymentFailedEvent},
    helpers,
    mpesa_types::StkCallbackEnvelope,
    traits::{MarketplaceDatabase, MarketplaceError, PaymentGateway},
};

/// Platform pricing knobs. The service fee is added on top of the line-item total and collected inside the same
/// M-Pesa charge.
#[derive(Debug, Clone, Copy)]
pub struct PricingConfig {
    pub service_fee: Money,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { service_fee: Money::from(50) }
    }
}

/// One entry of an incoming cart: just a product reference and a quantity. Prices always come from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: i64,
}

/// The result of a successful placement. Payment has been *initiated*, not confirmed; the caller should relay
/// `customer_message` and poll the order status (or wait for a notification) for the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub customer_message: String,
}

/// `OrderFlowApi` covers the buyer-side lifecycle: placing an order (catalog lookup, pricing, STK push,
/// persistence) and reconciling the gateway's asynchronous payment result against it.
#[derive(Clone)]
pub struct OrderFlowApi<B, G> {
    db: B,
    gateway: G,
    pricing: PricingConfig,
    producers: EventProducers,
}

impl<B, G> OrderFlowApi<B, G>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    pub fn new(db: B, gateway: G, pricing: PricingConfig, producers: EventProducers) -> Self {
        Self { db, gateway, pricing, producers }
    }

    /// Places an order on the given channel.
    ///
    /// The order in which things happen matters: the cart is validated and priced from the catalog first, then
    /// the gateway handshake runs, and only once the push has been *accepted* is anything written. A rejected or
    /// unreachable gateway therefore never leaves a half-placed order behind.
    pub async fn place_order(
        &self,
        buyer: &UserId,
        order_type: OrderType,
        items: &[CartItem],
        payer_phone: &str,
        shipping_address: ShippingAddress,
    ) -> Result<PlacedOrder, MarketplaceError> {
        if items.is_empty() {
            return Err(MarketplaceError::Validation("The order contains no items".to_string()));
        }
        if payer_phone.trim().is_empty() {
            return Err(MarketplaceError::Validation("A payer phone number is required".to_string()));
        }
        if !shipping_address.is_complete() {
            return Err(MarketplaceError::Validation("The shipping address is incomplete".to_string()));
        }
        let mut order_items = Vec::with_capacity(items.len());
        let mut total = Money::default();
        for item in items {
            if item.quantity <= 0 {
                return Err(MarketplaceError::Validation(format!(
                    "Invalid quantity for product {}",
                    item.product_id
                )));
            }
            let product = self
                .db
                .fetch_product(&item.product_id)
                .await?
                .ok_or_else(|| MarketplaceError::ProductNotFound(item.product_id.clone()))?;
            if product.order_type != order_type {
                return Err(MarketplaceError::Validation(format!(
                    "Product {} is not sold on the {order_type} channel",
                    product.id
                )));
            }
            total = total + product.unit_price * item.quantity;
            order_items.push(NewOrderItem {
                product_id: product.id,
                name: product.name,
                quantity: item.quantity,
                unit_price: product.unit_price,
                seller_id: product.seller_id,
            });
        }
        if order_type == OrderType::Bulk {
            let farmer = &order_items[0].seller_id;
            if order_items.iter().any(|i| &i.seller_id != farmer) {
                return Err(MarketplaceError::Validation(
                    "A bulk order must be placed with a single farmer".to_string(),
                ));
            }
        }
        let total = total + self.pricing.service_fee;
        let id = helpers::new_order_id();
        let response = self
            .gateway
            .initiate_stk_push(total, payer_phone, &id.short())
            .await
            .map_err(|e| MarketplaceError::GatewayError(e.to_string()))?;
        if !response.is_accepted() {
            info!("🛒️ STK push for order {id} was rejected: {}", response.response_description);
            return Err(MarketplaceError::GatewayError(response.response_description));
        }
        let new_order = NewOrder {
            id,
            order_type,
            buyer_id: buyer.clone(),
            items: order_items,
            total_amount: total,
            shipping_address,
            payer_phone: payer_phone.to_string(),
            checkout_request_id: response.checkout_request_id,
        };
        let sellers = new_order.sellers();
        let order = self.db.insert_order(new_order).await?;
        info!("🛒️ Order {} placed by {buyer} for {total}. Awaiting payment.", order.id);
        for producer in &self.producers.order_placed_producer {
            producer.publish_event(OrderPlacedEvent::new(order.clone(), sellers.clone())).await;
        }
        let customer_message = format!(
            "Payment request sent. Enter your M-Pesa PIN on {payer_phone} to pay {total} for order {}.",
            order.id.short()
        );
        Ok(PlacedOrder { order, customer_message })
    }

    /// Applies an STK callback. Idempotent under the gateway's at-least-once delivery; events fire only on the
    /// first application.
    pub async fn handle_payment_callback(
        &self,
        envelope: StkCallbackEnvelope,
    ) -> Result<CallbackOutcome, MarketplaceError> {
        let callback = envelope.body.stk_callback;
        let update = PaymentUpdate::from(&callback);
        let outcome = self.db.apply_payment_update(update).await?;
        match &outcome {
            CallbackOutcome::Applied { order, success: true } => {
                let items = self.db.fetch_order_items(&order.id).await?;
                let sellers = distinct_sellers(&items);
                for producer in &self.producers.payment_confirmed_producer {
                    producer
                        .publish_event(PaymentConfirmedEvent { order: order.clone(), sellers: sellers.clone() })
                        .await;
                }
            },
            CallbackOutcome::Applied { order, success: false } => {
                let reason = order.payment_failure_reason.clone().unwrap_or_else(|| callback.result_desc.clone());
                for producer in &self.producers.payment_failed_producer {
                    producer.publish_event(PaymentFailedEvent { order: order.clone(), reason: reason.clone() }).await;
                }
            },
            CallbackOutcome::AlreadyProcessed => {
                debug!("💰️ Duplicate callback for {}. Nothing to do.", callback.checkout_request_id);
            },
            CallbackOutcome::OrderNotFound => {
                warn!("💰️ Callback for unknown checkout request {}", callback.checkout_request_id);
            },
        }
        Ok(outcome)
    }

    pub async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, MarketplaceError> {
        self.db.fetch_order(id).await
    }

    pub async fn order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, MarketplaceError> {
        self.db.fetch_order_items(id).await
    }

    pub async fn orders_for_buyer(&self, buyer: &UserId) -> Result<Vec<Order>, MarketplaceError> {
        self.db.fetch_orders_for_buyer(buyer).await
    }

    pub async fn orders_for_seller(&self, seller: &UserId) -> Result<Vec<Order>, MarketplaceError> {
        self.db.fetch_orders_for_seller(seller).await
    }
}

fn distinct_sellers(items: &[OrderItem]) -> Vec<UserId> {
    let mut sellers = Vec::new();
    for item in items {
        if !sellers.contains(&item.seller_id) {
            sellers.push(item.seller_id.clone());
        }
    }
    sellers
}
