mod support;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use soko_common::Money;
use soko_engine::{
    db_types::{CallbackOutcome, OrderStatus, OrderType, PaymentStatus, ShippingAddress, UserId},
    events::{EventHandler, EventProducers},
    CartItem,
    MarketplaceDatabase,
    MarketplaceError,
    OrderFlowApi,
    PricingConfig,
};
use support::*;

#[tokio::test]
async fn retail_order_placement_and_payment() {
    let env = new_env(TestGateway::default()).await;
    let placed = place_retail_order(&env).await;
    assert_eq!(placed.order.total_amount, Money::from(490));
    assert_eq!(placed.order.order_type, OrderType::Retail);
    assert_eq!(placed.order.payment_status, PaymentStatus::Pending);
    assert_eq!(placed.order.order_status, OrderStatus::Processing);
    assert!(placed.customer_message.contains("M-Pesa"));

    // Line items are snapshotted with the catalog price at placement time
    let items = env.db.fetch_order_items(&placed.order.id).await.unwrap();
    assert_eq!(items.len(), 2);
    let tomatoes = items.iter().find(|i| i.product_id == "prod-tomatoes").unwrap();
    assert_eq!(tomatoes.unit_price, Money::from(120));
    assert_eq!(tomatoes.quantity, 2);
    assert_eq!(tomatoes.seller_id, UserId::from(VENDOR));

    let outcome =
        env.order_flow.handle_payment_callback(success_callback(&placed.order.checkout_request_id)).await.unwrap();
    let CallbackOutcome::Applied { order, success: true } = outcome else {
        panic!("Expected the callback to be applied");
    };
    assert_eq!(order.payment_status, PaymentStatus::Held);
    assert_eq!(order.order_status, OrderStatus::Confirmed);
    assert_eq!(order.receipt_number.as_deref(), Some("NLJ7RT61SV"));
}

#[tokio::test]
async fn replayed_callback_changes_nothing() {
    let env = new_env(TestGateway::default()).await;
    let order = paid_retail_order(&env).await;
    let replay =
        env.order_flow.handle_payment_callback(success_callback(&order.checkout_request_id)).await.unwrap();
    assert!(matches!(replay, CallbackOutcome::AlreadyProcessed));
    let after = env.db.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(after.payment_status, PaymentStatus::Held);
    assert_eq!(after.order_status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn failed_payment_only_touches_the_payment_record() {
    let env = new_env(TestGateway::default()).await;
    let placed = place_retail_order(&env).await;
    let outcome =
        env.order_flow.handle_payment_callback(failure_callback(&placed.order.checkout_request_id)).await.unwrap();
    let CallbackOutcome::Applied { order, success: false } = outcome else {
        panic!("Expected the failure to be applied");
    };
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    // Only the payment record fails; the order status is untouched
    assert_eq!(order.order_status, OrderStatus::Processing);
    assert_eq!(order.payment_failure_reason.as_deref(), Some("Request cancelled by user."));

    // A failed order is not in escrow and cannot enter fulfilment
    let err = env.dispatch.accept_order(&UserId::from(VENDOR), &order.id).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn callback_for_unknown_checkout_is_dropped() {
    let env = new_env(TestGateway::default()).await;
    let outcome = env.order_flow.handle_payment_callback(success_callback("ws_CO_nothing_here")).await.unwrap();
    assert!(matches!(outcome, CallbackOutcome::OrderNotFound));
}

#[tokio::test]
async fn unreachable_gateway_leaves_no_order_behind() {
    let env = new_env(TestGateway { unreachable: true, ..Default::default() }).await;
    let cart = [CartItem { product_id: "prod-tomatoes".to_string(), quantity: 1 }];
    let err = env
        .order_flow
        .place_order(&UserId::from(BUYER), OrderType::Retail, &cart, PHONE, nairobi_address())
        .await
        .unwrap_err();
    assert!(matches!(err, MarketplaceError::GatewayError(_)));
    let orders = env.db.fetch_orders_for_buyer(&UserId::from(BUYER)).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn carts_are_validated() {
    let env = new_env(TestGateway::default()).await;
    let buyer = UserId::from(BUYER);

    let err = env
        .order_flow
        .place_order(&buyer, OrderType::Retail, &[], PHONE, nairobi_address())
        .await
        .unwrap_err();
    assert!(matches!(err, MarketplaceError::Validation(_)));

    let zero_qty = [CartItem { product_id: "prod-tomatoes".to_string(), quantity: 0 }];
    let err = env
        .order_flow
        .place_order(&buyer, OrderType::Retail, &zero_qty, PHONE, nairobi_address())
        .await
        .unwrap_err();
    assert!(matches!(err, MarketplaceError::Validation(_)));

    let unknown = [CartItem { product_id: "prod-dragonfruit".to_string(), quantity: 1 }];
    let err = env
        .order_flow
        .place_order(&buyer, OrderType::Retail, &unknown, PHONE, nairobi_address())
        .await
        .unwrap_err();
    assert!(matches!(err, MarketplaceError::ProductNotFound(_)));

    // A bulk-only product cannot sneak onto the retail channel
    let wrong_channel = [CartItem { product_id: "prod-maize-90kg".to_string(), quantity: 1 }];
    let err = env
        .order_flow
        .place_order(&buyer, OrderType::Retail, &wrong_channel, PHONE, nairobi_address())
        .await
        .unwrap_err();
    assert!(matches!(err, MarketplaceError::Validation(_)));

    let cart = [CartItem { product_id: "prod-tomatoes".to_string(), quantity: 1 }];
    let incomplete = ShippingAddress {
        street: "Moi Avenue 12".to_string(),
        city: "  ".to_string(),
        postal_code: "00100".to_string(),
        country: "Kenya".to_string(),
    };
    let err = env.order_flow.place_order(&buyer, OrderType::Retail, &cart, PHONE, incomplete).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Validation(_)));

    let err = env
        .order_flow
        .place_order(&buyer, OrderType::Retail, &cart, "", nairobi_address())
        .await
        .unwrap_err();
    assert!(matches!(err, MarketplaceError::Validation(_)));

    // A bulk consignment comes from a single farm
    let two_farmers = [
        CartItem { product_id: "prod-maize-90kg".to_string(), quantity: 1 },
        CartItem { product_id: "prod-beans-90kg".to_string(), quantity: 1 },
    ];
    let err = env
        .order_flow
        .place_order(&UserId::from(VENDOR), OrderType::Bulk, &two_farmers, PHONE, nairobi_address())
        .await
        .unwrap_err();
    assert!(matches!(err, MarketplaceError::Validation(_)));
}

#[tokio::test]
async fn buyer_and_seller_listings() {
    let env = new_env(TestGateway::default()).await;
    let first = paid_retail_order(&env).await;
    let second = place_retail_order(&env).await.order;

    let buyer_orders = env.order_flow.orders_for_buyer(&UserId::from(BUYER)).await.unwrap();
    assert_eq!(buyer_orders.len(), 2);

    let vendor_orders = env.order_flow.orders_for_seller(&UserId::from(VENDOR)).await.unwrap();
    assert_eq!(vendor_orders.len(), 2);
    assert!(vendor_orders.iter().any(|o| o.id == first.id));
    assert!(vendor_orders.iter().any(|o| o.id == second.id));

    // A vendor with no line items on these orders sees nothing
    let other = env.order_flow.orders_for_seller(&UserId::from(VENDOR_2)).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn payment_confirmed_event_fires_exactly_once() {
    let url = soko_engine::test_utils::prepare_env::random_db_path();
    soko_engine::test_utils::prepare_env::prepare_test_env(&url).await;
    let db = soko_engine::SqliteDatabase::new_with_url(&url, 5).await.unwrap();
    seed_catalog(&db).await;

    let confirmations = Arc::new(AtomicU64::new(0));
    let counter = confirmations.clone();
    let handler = EventHandler::new(10, Arc::new(move |_ev| {
        let counter = counter.clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    }));
    let mut producers = EventProducers::default();
    producers.payment_confirmed_producer.push(handler.subscribe());
    let api = OrderFlowApi::new(db, TestGateway::default(), PricingConfig::default(), producers);

    let cart = [CartItem { product_id: "prod-tomatoes".to_string(), quantity: 3 }];
    let placed = api
        .place_order(&UserId::from(BUYER), OrderType::Retail, &cart, PHONE, nairobi_address())
        .await
        .unwrap();
    api.handle_payment_callback(success_callback(&placed.order.checkout_request_id)).await.unwrap();
    // the replay must not fire the event again
    api.handle_payment_callback(success_callback(&placed.order.checkout_request_id)).await.unwrap();

    drop(api);
    handler.start_handler().await;
    assert_eq!(confirmations.load(Ordering::SeqCst), 1);
}
