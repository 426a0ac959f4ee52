use actix_http::Request;
use actix_web::{
    dev::{Service, ServiceResponse},
    test,
    Error,
};
use serde_json::{json, Value};

use super::helpers::*;

/// Places a retail order as the buyer and settles it through the payment callback.
async fn paid_order<S>(app: &S) -> String
where
    S: Service<Request, Response = ServiceResponse, Error = Error>,
{
    let placed: Value =
        test::call_and_read_body_json(app, post_json("/orders", BUYER, "buyer", order_body()).to_request()).await;
    let checkout = placed["order"]["checkout_request_id"].as_str().unwrap().to_string();
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();
    let callback =
        test::TestRequest::post().uri("/payments/mpesa/callback").set_json(success_callback(&checkout)).to_request();
    let res = test::call_service(app, callback).await;
    assert!(res.status().is_success());
    order_id
}

#[actix_web::test]
async fn full_retail_fulfilment_over_http() {
    let app = spawn_app(test_db().await).await;
    let order_id = paid_order(&app).await;

    // The vendor accepts and gets the pickup code, but never the delivery code
    let task: Value = test::call_and_read_body_json(
        &app,
        post_json(&format!("/orders/{order_id}/accept"), VENDOR, "vendor", json!({})).to_request(),
    )
    .await;
    assert_eq!(task["status"], "AwaitingAcceptance");
    let pickup_code = task["pickup_code"].as_str().unwrap().to_string();
    assert!(task.get("delivery_confirmation_code").is_none());
    let task_id = task["id"].as_str().unwrap().to_string();

    // The pool shows the task to riders, codes excluded
    let pool: Value = test::call_and_read_body_json(&app, get("/tasks/available", RIDER, "rider").to_request()).await;
    assert_eq!(pool.as_array().unwrap().len(), 1);
    assert_eq!(pool[0]["id"], task_id.as_str());
    assert_eq!(pool[0]["order_value"], 290);
    assert!(pool[0].get("pickup_code").is_none());

    // First rider wins the claim, the second gets a conflict
    let res =
        test::call_service(&app, post_json(&format!("/tasks/{task_id}/claim"), RIDER, "rider", json!({})).to_request())
            .await;
    assert!(res.status().is_success());
    let res = test::call_service(
        &app,
        post_json(&format!("/tasks/{task_id}/claim"), RIDER_2, "rider", json!({})).to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 409);

    // The buyer's status view carries the delivery code and hides the pickup code
    let status: Value = test::call_and_read_body_json(
        &app,
        get(&format!("/orders/{order_id}/status"), BUYER, "buyer").to_request(),
    )
    .await;
    let delivery_code = status["task"]["delivery_confirmation_code"].as_str().unwrap().to_string();
    assert!(status["task"].get("pickup_code").is_none());

    // A bad pickup scan is rejected without detail
    let res = test::call_service(
        &app,
        post_json(&format!("/orders/{order_id}/pickup"), RIDER, "rider", json!({ "code": "WRONG1" })).to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 401);

    let res = test::call_service(
        &app,
        post_json(&format!("/orders/{order_id}/pickup"), RIDER, "rider", json!({ "code": pickup_code })).to_request(),
    )
    .await;
    assert!(res.status().is_success());

    let res = test::call_service(
        &app,
        post_json(&format!("/orders/{order_id}/deliver"), RIDER, "rider", json!({ "code": delivery_code }))
            .to_request(),
    )
    .await;
    assert!(res.status().is_success());

    let status: Value = test::call_and_read_body_json(
        &app,
        get(&format!("/orders/{order_id}/status"), BUYER, "buyer").to_request(),
    )
    .await;
    assert_eq!(status["order"]["payment_status"], "Released");
    assert_eq!(status["order"]["order_status"], "Delivered");
    assert_eq!(status["task"]["status"], "Delivered");

    // Escrow is empty again and the rider has been credited
    let escrow: Value = test::call_and_read_body_json(&app, get("/admin/escrow", "admin-carol", "admin").to_request()).await;
    assert_eq!(escrow["total"], 0);
    assert_eq!(escrow["order_count"], 0);

    let earnings: Value = test::call_and_read_body_json(&app, get("/tasks/earnings", RIDER, "rider").to_request()).await;
    assert_eq!(earnings["total_earned"], 200);
    assert_eq!(earnings["delivery_count"], 1);
}

#[actix_web::test]
async fn acceptance_is_once_only() {
    let app = spawn_app(test_db().await).await;
    let order_id = paid_order(&app).await;
    let res = test::call_service(
        &app,
        post_json(&format!("/orders/{order_id}/accept"), VENDOR, "vendor", json!({})).to_request(),
    )
    .await;
    assert!(res.status().is_success());
    let res = test::call_service(
        &app,
        post_json(&format!("/orders/{order_id}/accept"), VENDOR, "vendor", json!({})).to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 409);
}

#[actix_web::test]
async fn unpaid_orders_cannot_be_accepted() {
    let app = spawn_app(test_db().await).await;
    let placed: Value =
        test::call_and_read_body_json(&app, post_json("/orders", BUYER, "buyer", order_body()).to_request()).await;
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();
    let res = test::call_service(
        &app,
        post_json(&format!("/orders/{order_id}/accept"), VENDOR, "vendor", json!({})).to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 409);
}

#[actix_web::test]
async fn other_sellers_cannot_accept() {
    let app = spawn_app(test_db().await).await;
    let order_id = paid_order(&app).await;
    let res = test::call_service(
        &app,
        post_json(&format!("/orders/{order_id}/accept"), FARMER, "farmer", json!({})).to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 403);
}

#[actix_web::test]
async fn escrow_is_admin_only() {
    let app = spawn_app(test_db().await).await;
    let res = test::call_service(&app, get("/admin/escrow", RIDER, "rider").to_request()).await;
    assert_eq!(res.status().as_u16(), 403);
}
