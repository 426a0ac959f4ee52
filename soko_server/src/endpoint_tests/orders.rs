use actix_web::test;
use serde_json::Value;

use super::helpers::*;

#[actix_web::test]
async fn health_check() {
    let app = spawn_app(test_db().await).await;
    let res = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert!(res.status().is_success());
}

#[actix_web::test]
async fn placing_requires_identity() {
    let app = spawn_app(test_db().await).await;
    let req = test::TestRequest::post().uri("/orders").set_json(order_body()).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 401);
}

#[actix_web::test]
async fn riders_cannot_place_retail_orders() {
    let app = spawn_app(test_db().await).await;
    let res = test::call_service(&app, post_json("/orders", RIDER, "rider", order_body()).to_request()).await;
    assert_eq!(res.status().as_u16(), 403);
}

#[actix_web::test]
async fn buyer_places_and_pays_for_an_order() {
    let app = spawn_app(test_db().await).await;
    let placed: Value =
        test::call_and_read_body_json(&app, post_json("/orders", BUYER, "buyer", order_body()).to_request()).await;
    // 2 x KSh 120 of tomatoes plus the KSh 50 service fee
    assert_eq!(placed["order"]["total_amount"], 290);
    assert_eq!(placed["order"]["payment_status"], "Pending");
    assert_eq!(placed["order"]["order_status"], "Processing");
    let checkout = placed["order"]["checkout_request_id"].as_str().unwrap().to_string();
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();

    let callback =
        test::TestRequest::post().uri("/payments/mpesa/callback").set_json(success_callback(&checkout)).to_request();
    let res = test::call_service(&app, callback).await;
    assert!(res.status().is_success());

    let status: Value = test::call_and_read_body_json(
        &app,
        get(&format!("/orders/{order_id}/status"), BUYER, "buyer").to_request(),
    )
    .await;
    assert_eq!(status["order"]["payment_status"], "Held");
    assert_eq!(status["order"]["order_status"], "Confirmed");
    assert_eq!(status["order"]["receipt_number"], "NLJ7RT61SV");
}

#[actix_web::test]
async fn malformed_callbacks_still_get_a_200() {
    let app = spawn_app(test_db().await).await;
    let req = test::TestRequest::post().uri("/payments/mpesa/callback").set_payload("not json").to_request();
    let res = test::call_service(&app, req).await;
    assert!(res.status().is_success());
}

#[actix_web::test]
async fn only_participants_see_order_status() {
    let app = spawn_app(test_db().await).await;
    let placed: Value =
        test::call_and_read_body_json(&app, post_json("/orders", BUYER, "buyer", order_body()).to_request()).await;
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();

    // The vendor sells on this order; a random other buyer does not
    let res = test::call_service(&app, get(&format!("/orders/{order_id}/status"), VENDOR, "vendor").to_request()).await;
    assert!(res.status().is_success());
    let res =
        test::call_service(&app, get(&format!("/orders/{order_id}/status"), "buyer-nosy", "buyer").to_request()).await;
    assert_eq!(res.status().as_u16(), 403);
}

#[actix_web::test]
async fn unknown_orders_are_a_404() {
    let app = spawn_app(test_db().await).await;
    let res =
        test::call_service(&app, get("/orders/ord-does-not-exist/status", BUYER, "buyer").to_request()).await;
    assert_eq!(res.status().as_u16(), 404);
}
