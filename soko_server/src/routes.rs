//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate
//! module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the payment gateway so that the endpoint tests can run the full HTTP stack against
//! a scripted gateway. [`crate::server::configure_routes`] pins the generics at registration time.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use serde_json::json;
use soko_engine::{
    db_types::{OrderId, OrderType, TaskId},
    DispatchApi,
    OrderFlowApi,
    PaymentGateway,
    SettlementApi,
    SqliteDatabase,
};

use crate::{
    auth::{AuthenticatedUser, Role},
    data_objects::{JsonResponse, NewOrderRequest, OrderStatusResponse, ScanRequest, TaskView},
    errors::ServerError,
};

type OrderFlow<G> = web::Data<OrderFlowApi<SqliteDatabase, G>>;
type Dispatch = web::Data<DispatchApi<SqliteDatabase>>;

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Orders  ----------------------------------------------------

/// Route handler for `POST /orders`. Buyers place retail orders here.
pub async fn place_order<G: PaymentGateway + 'static>(
    user: AuthenticatedUser,
    body: web::Json<NewOrderRequest>,
    api: OrderFlow<G>,
) -> Result<HttpResponse, ServerError> {
    user.require(&[Role::Buyer])?;
    let req = body.into_inner();
    let placed =
        api.place_order(&user.id, OrderType::Retail, &req.items, &req.phone_number, req.shipping_address).await?;
    Ok(HttpResponse::Ok().json(placed))
}

/// Route handler for `POST /bulk-orders`. Vendors restock from farmers here; same flow, bulk channel.
pub async fn place_bulk_order<G: PaymentGateway + 'static>(
    user: AuthenticatedUser,
    body: web::Json<NewOrderRequest>,
    api: OrderFlow<G>,
) -> Result<HttpResponse, ServerError> {
    user.require(&[Role::Vendor])?;
    let req = body.into_inner();
    let placed =
        api.place_order(&user.id, OrderType::Bulk, &req.items, &req.phone_number, req.shipping_address).await?;
    Ok(HttpResponse::Ok().json(placed))
}

/// Route handler for `GET /orders`. The caller's own orders, newest first.
pub async fn my_orders<G: PaymentGateway + 'static>(
    user: AuthenticatedUser,
    api: OrderFlow<G>,
) -> Result<HttpResponse, ServerError> {
    let orders = api.orders_for_buyer(&user.id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// Route handler for `GET /orders/selling`. Orders containing at least one of the caller's products.
pub async fn selling_orders<G: PaymentGateway + 'static>(
    user: AuthenticatedUser,
    api: OrderFlow<G>,
) -> Result<HttpResponse, ServerError> {
    user.require(&[Role::Vendor, Role::Farmer])?;
    let orders = api.orders_for_seller(&user.id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// Route handler for `GET /orders/{id}/status`. Only participants (the buyer, a seller on the order, or an
/// admin) may look, and each sees only the handoff code meant for them.
pub async fn order_status<G: PaymentGateway + 'static>(
    user: AuthenticatedUser,
    path: web::Path<String>,
    api: OrderFlow<G>,
    dispatch: Dispatch,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let order = api
        .fetch_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    let items = api.order_items(&order_id).await?;
    let is_buyer = order.buyer_id == user.id;
    let is_seller = items.iter().any(|i| i.seller_id == user.id);
    if !(is_buyer || is_seller || user.role == Role::Admin) {
        return Err(ServerError::InsufficientPermissions("You are not a participant in this order".to_string()));
    }
    let task = dispatch.task_for_order(&order_id).await?.map(|t| {
        if user.role == Role::Admin {
            TaskView::for_admin(t)
        } else if is_buyer {
            TaskView::for_buyer(t)
        } else {
            TaskView::for_seller(t)
        }
    });
    Ok(HttpResponse::Ok().json(OrderStatusResponse { order, items, task }))
}

/// Route handler for `POST /orders/{id}/accept`. Seller acceptance; the response carries the pickup code for
/// the seller to display at their premises.
pub async fn accept_order(
    user: AuthenticatedUser,
    path: web::Path<String>,
    dispatch: Dispatch,
) -> Result<HttpResponse, ServerError> {
    user.require(&[Role::Vendor, Role::Farmer])?;
    let order_id = OrderId::from(path.into_inner());
    let task = dispatch.accept_order(&user.id, &order_id).await?;
    Ok(HttpResponse::Ok().json(TaskView::for_seller(task)))
}

// ----------------------------------------------  Payments  ---------------------------------------------------

/// Route handler for `POST /payments/mpesa/callback`.
///
/// Daraja retries until it sees a 200, so this route acknowledges unconditionally; anything that goes wrong is
/// logged and dealt with out of band. The body is taken as raw bytes so that even an unparseable payload gets
/// its 200.
pub async fn mpesa_callback<G: PaymentGateway + 'static>(body: web::Bytes, api: OrderFlow<G>) -> HttpResponse {
    match serde_json::from_slice(&body) {
        Ok(envelope) => {
            if let Err(e) = api.handle_payment_callback(envelope).await {
                error!("💰️ Error applying payment callback: {e}");
            }
        },
        Err(e) => warn!("💰️ Discarding malformed payment callback: {e}"),
    }
    HttpResponse::Ok().json(json!({ "ResultCode": 0, "ResultDesc": "Accepted" }))
}

// ----------------------------------------------   Tasks  -----------------------------------------------------

/// Route handler for `GET /tasks/available`. The open pool, oldest first.
pub async fn available_tasks(user: AuthenticatedUser, dispatch: Dispatch) -> Result<HttpResponse, ServerError> {
    user.require(&[Role::Rider])?;
    let tasks = dispatch.available_tasks().await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Route handler for `GET /tasks/mine`. The rider's claimed, still-active tasks.
pub async fn my_tasks(user: AuthenticatedUser, dispatch: Dispatch) -> Result<HttpResponse, ServerError> {
    user.require(&[Role::Rider])?;
    let tasks = dispatch.tasks_for_courier(&user.id).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Route handler for `POST /tasks/{id}/claim`. First rider wins; everyone else gets a 409.
pub async fn claim_task(
    user: AuthenticatedUser,
    path: web::Path<String>,
    dispatch: Dispatch,
) -> Result<HttpResponse, ServerError> {
    user.require(&[Role::Rider])?;
    let task_id = TaskId::from(path.into_inner());
    let task = dispatch.claim_task(&user.id, &task_id).await?;
    info!("🚚️ Task {} claimed by {}", task.id, user.id);
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!(
        "Task claimed. Collect the order from the seller at {}",
        task.delivery_address
    ))))
}

/// Route handler for `POST /orders/{id}/pickup`. The rider submits the code scanned at the seller's premises.
pub async fn confirm_pickup(
    user: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<ScanRequest>,
    dispatch: Dispatch,
) -> Result<HttpResponse, ServerError> {
    user.require(&[Role::Rider])?;
    let order_id = OrderId::from(path.into_inner());
    dispatch.confirm_pickup(&user.id, &order_id, body.code.trim()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Pickup verified. The order is now in transit.")))
}

/// Route handler for `POST /orders/{id}/deliver`. The rider submits the buyer's confirmation code; success
/// releases the escrowed payment to the seller.
pub async fn confirm_delivery(
    user: AuthenticatedUser,
    path: web::Path<String>,
    body: web::Json<ScanRequest>,
    dispatch: Dispatch,
) -> Result<HttpResponse, ServerError> {
    user.require(&[Role::Rider])?;
    let order_id = OrderId::from(path.into_inner());
    dispatch.confirm_delivery(&user.id, &order_id, body.code.trim()).await?;
    Ok(HttpResponse::Ok()
        .json(JsonResponse::success("Delivery confirmed. Payment has been released to the seller.")))
}

/// Route handler for `GET /tasks/earnings`. The rider's completed deliveries and fee total.
pub async fn earnings(user: AuthenticatedUser, dispatch: Dispatch) -> Result<HttpResponse, ServerError> {
    user.require(&[Role::Rider])?;
    let earnings = dispatch.earnings_for_courier(&user.id).await?;
    Ok(HttpResponse::Ok().json(earnings))
}

// ----------------------------------------------   Admin  -----------------------------------------------------

/// Route handler for `GET /admin/escrow`. The funds currently held, recomputed on demand.
pub async fn escrow(
    user: AuthenticatedUser,
    settlement: web::Data<SettlementApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    user.require(&[])?;
    let summary = settlement.escrow_summary().await?;
    Ok(HttpResponse::Ok().json(summary))
}
