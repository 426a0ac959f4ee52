//! Shared scaffolding for the integration tests: a throwaway database per test, a seeded catalog, a scriptable
//! payment gateway, and canned Daraja callbacks.
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use soko_common::Money;
use soko_engine::{
    db_types::{CallbackOutcome, Order, OrderType, Product, ShippingAddress, UserId},
    events::EventProducers,
    mpesa_types::{StkCallbackEnvelope, StkPushResponse},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    CartItem,
    DeliveryFees,
    DispatchApi,
    MarketplaceDatabase,
    OrderFlowApi,
    PaymentGateway,
    PaymentGatewayError,
    PlacedOrder,
    PricingConfig,
    SqliteDatabase,
};

pub const VENDOR: &str = "vendor-wanjiku";
pub const VENDOR_2: &str = "vendor-otieno";
pub const FARMER: &str = "farmer-kamau";
pub const FARMER_2: &str = "farmer-chebet";
pub const BUYER: &str = "buyer-akinyi";
pub const RIDER: &str = "rider-mutua";
pub const RIDER_2: &str = "rider-njeri";
pub const PHONE: &str = "254708374149";

/// A scriptable stand-in for the Daraja client. Accepts every push by default; can be told to reject, or to be
/// unreachable altogether.
#[derive(Clone, Default)]
pub struct TestGateway {
    pub reject: bool,
    pub unreachable: bool,
    pub counter: Arc<AtomicU64>,
}

impl PaymentGateway for TestGateway {
    async fn initiate_stk_push(
        &self,
        _amount: Money,
        _phone: &str,
        account_ref: &str,
    ) -> Result<StkPushResponse, PaymentGatewayError> {
        if self.unreachable {
            return Err(PaymentGatewayError::RequestFailed("connection refused".to_string()));
        }
        if self.reject {
            return Err(PaymentGatewayError::Rejected {
                code: "1".to_string(),
                message: "The initiator information is invalid".to_string(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(StkPushResponse {
            merchant_request_id: format!("29115-{n}"),
            checkout_request_id: format!("ws_CO_test_{account_ref}_{n}"),
            response_code: "0".to_string(),
            response_description: "Success. Request accepted for processing".to_string(),
            customer_message: "Success. Request accepted for processing".to_string(),
        })
    }
}

pub struct TestEnv {
    pub db: SqliteDatabase,
    pub order_flow: OrderFlowApi<SqliteDatabase, TestGateway>,
    pub dispatch: DispatchApi<SqliteDatabase>,
}

pub async fn new_env(gateway: TestGateway) -> TestEnv {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    seed_catalog(&db).await;
    let order_flow =
        OrderFlowApi::new(db.clone(), gateway, PricingConfig::default(), EventProducers::default());
    let dispatch = DispatchApi::new(db.clone(), DeliveryFees::default(), EventProducers::default());
    TestEnv { db, order_flow, dispatch }
}

pub async fn seed_catalog(db: &SqliteDatabase) {
    let products = [
        Product {
            id: "prod-tomatoes".to_string(),
            name: "Tomatoes (1kg)".to_string(),
            unit_price: Money::from(120),
            seller_id: UserId::from(VENDOR),
            order_type: OrderType::Retail,
        },
        Product {
            id: "prod-sukuma".to_string(),
            name: "Sukuma wiki (bunch)".to_string(),
            unit_price: Money::from(40),
            seller_id: UserId::from(VENDOR),
            order_type: OrderType::Retail,
        },
        Product {
            id: "prod-avocado".to_string(),
            name: "Avocados (tray)".to_string(),
            unit_price: Money::from(450),
            seller_id: UserId::from(VENDOR_2),
            order_type: OrderType::Retail,
        },
        Product {
            id: "prod-maize-90kg".to_string(),
            name: "Maize (90kg bag)".to_string(),
            unit_price: Money::from(3800),
            seller_id: UserId::from(FARMER),
            order_type: OrderType::Bulk,
        },
        Product {
            id: "prod-beans-90kg".to_string(),
            name: "Beans (90kg bag)".to_string(),
            unit_price: Money::from(9500),
            seller_id: UserId::from(FARMER_2),
            order_type: OrderType::Bulk,
        },
    ];
    for product in products {
        db.upsert_product(product).await.expect("Error seeding catalog");
    }
}

pub fn nairobi_address() -> ShippingAddress {
    ShippingAddress {
        street: "Moi Avenue 12".to_string(),
        city: "Nairobi".to_string(),
        postal_code: "00100".to_string(),
        country: "Kenya".to_string(),
    }
}

pub fn success_callback(checkout_request_id: &str) -> StkCallbackEnvelope {
    serde_json::from_value(serde_json::json!({
        "Body": { "stkCallback": {
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": checkout_request_id,
            "ResultCode": 0,
            "ResultDesc": "The service request is processed successfully.",
            "CallbackMetadata": { "Item": [
                { "Name": "Amount", "Value": 490.0 },
                { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
                { "Name": "TransactionDate", "Value": 20240601102115u64 },
                { "Name": "PhoneNumber", "Value": 254708374149u64 }
            ]}
        }}
    }))
    .expect("Invalid callback fixture")
}

pub fn failure_callback(checkout_request_id: &str) -> StkCallbackEnvelope {
    serde_json::from_value(serde_json::json!({
        "Body": { "stkCallback": {
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": checkout_request_id,
            "ResultCode": 1032,
            "ResultDesc": "Request cancelled by user."
        }}
    }))
    .expect("Invalid callback fixture")
}

/// 2kg tomatoes + 5 bunches sukuma, both from `VENDOR`. KSh 440 of produce plus the KSh 50 service fee.
pub async fn place_retail_order(env: &TestEnv) -> PlacedOrder {
    let cart = [
        CartItem { product_id: "prod-tomatoes".to_string(), quantity: 2 },
        CartItem { product_id: "prod-sukuma".to_string(), quantity: 5 },
    ];
    env.order_flow
        .place_order(&UserId::from(BUYER), OrderType::Retail, &cart, PHONE, nairobi_address())
        .await
        .expect("Error placing order")
}

/// The vendor restocking from the farmer: 2 bags of maize. KSh 7600 plus the service fee.
pub async fn place_bulk_order(env: &TestEnv) -> PlacedOrder {
    let cart = [CartItem { product_id: "prod-maize-90kg".to_string(), quantity: 2 }];
    env.order_flow
        .place_order(&UserId::from(VENDOR), OrderType::Bulk, &cart, PHONE, nairobi_address())
        .await
        .expect("Error placing order")
}

pub async fn confirm_payment(env: &TestEnv, order: &Order) -> Order {
    let outcome = env
        .order_flow
        .handle_payment_callback(success_callback(&order.checkout_request_id))
        .await
        .expect("Error applying callback");
    match outcome {
        CallbackOutcome::Applied { order, success: true } => order,
        other => panic!("Unexpected callback outcome: {other:?}"),
    }
}

pub async fn paid_retail_order(env: &TestEnv) -> Order {
    let placed = place_retail_order(env).await;
    confirm_payment(env, &placed.order).await
}

pub async fn paid_bulk_order(env: &TestEnv) -> Order {
    let placed = place_bulk_order(env).await;
    confirm_payment(env, &placed.order).await
}
