use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use actix_http::Request;
use actix_web::{
    dev::{Service, ServiceResponse},
    test,
    web,
    App,
    Error,
};
use soko_common::Money;
use soko_engine::{
    db_types::{OrderType, Product, UserId},
    events::EventProducers,
    mpesa_types::StkPushResponse,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    DeliveryFees,
    DispatchApi,
    MarketplaceDatabase,
    OrderFlowApi,
    PaymentGateway,
    PaymentGatewayError,
    PricingConfig,
    SettlementApi,
    SqliteDatabase,
};

use crate::server::configure_routes;

pub const VENDOR: &str = "vendor-wanjiku";
pub const FARMER: &str = "farmer-kamau";
pub const BUYER: &str = "buyer-akinyi";
pub const RIDER: &str = "rider-mutua";
pub const RIDER_2: &str = "rider-njeri";

/// Accepts every STK push with a predictable checkout request id.
#[derive(Clone, Default)]
pub struct TestGateway {
    counter: Arc<AtomicU64>,
}

impl PaymentGateway for TestGateway {
    async fn initiate_stk_push(
        &self,
        _amount: Money,
        _phone: &str,
        account_ref: &str,
    ) -> Result<StkPushResponse, PaymentGatewayError> {
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

pub async fn test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    seed_catalog(&db).await;
    db
}

async fn seed_catalog(db: &SqliteDatabase) {
    let products = [
        Product {
            id: "prod-tomatoes".to_string(),
            name: "Tomatoes (1kg)".to_string(),
            unit_price: Money::from(120),
            seller_id: UserId::from(VENDOR),
            order_type: OrderType::Retail,
        },
        Product {
            id: "prod-maize-90kg".to_string(),
            name: "Maize (90kg bag)".to_string(),
            unit_price: Money::from(3800),
            seller_id: UserId::from(FARMER),
            order_type: OrderType::Bulk,
        },
    ];
    for product in products {
        db.upsert_product(product).await.expect("Error seeding catalog");
    }
}

pub async fn spawn_app(
    db: SqliteDatabase,
) -> impl Service<Request, Response = ServiceResponse, Error = Error> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(OrderFlowApi::new(
                db.clone(),
                TestGateway::default(),
                PricingConfig::default(),
                EventProducers::default(),
            )))
            .app_data(web::Data::new(DispatchApi::new(
                db.clone(),
                DeliveryFees::default(),
                EventProducers::default(),
            )))
            .app_data(web::Data::new(SettlementApi::new(db)))
            .configure(configure_routes::<TestGateway>),
    )
    .await
}

pub fn get(path: &str, user: &str, role: &str) -> test::TestRequest {
    test::TestRequest::get().uri(path).insert_header(("X-User-Id", user)).insert_header(("X-User-Role", role))
}

pub fn post_json(path: &str, user: &str, role: &str, body: serde_json::Value) -> test::TestRequest {
    test::TestRequest::post()
        .uri(path)
        .insert_header(("X-User-Id", user))
        .insert_header(("X-User-Role", role))
        .set_json(body)
}

pub fn order_body() -> serde_json::Value {
    serde_json::json!({
        "items": [{ "product_id": "prod-tomatoes", "quantity": 2 }],
        "phone_number": "254708374149",
        "shipping_address": {
            "street": "Moi Avenue 12",
            "city": "Nairobi",
            "postal_code": "00100",
            "country": "Kenya"
        }
    })
}

pub fn success_callback(checkout_request_id: &str) -> serde_json::Value {
    serde_json::json!({
        "Body": { "stkCallback": {
            "MerchantRequestID": "29115-34620561-1",
            "CheckoutRequestID": checkout_request_id,
            "ResultCode": 0,
            "ResultDesc": "The service request is processed successfully.",
            "CallbackMetadata": { "Item": [
                { "Name": "Amount", "Value": 290.0 },
                { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
                { "Name": "PhoneNumber", "Value": 254708374149u64 }
            ]}
        }}
    })
}
