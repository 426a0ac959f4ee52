use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use soko_engine::{
    events::EventHandlers,
    DispatchApi,
    OrderFlowApi,
    PaymentGateway,
    SettlementApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    hooks::create_notification_hooks,
    integrations::DarajaGateway,
    routes,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = DarajaGateway::new(config.daraja.clone());
    let srv = create_server_instance(config, db, gateway)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Assembles the HTTP server around the given backend and gateway. The gateway is generic so that tests can run
/// the full stack against a scripted one.
pub fn create_server_instance<G>(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: G,
) -> Result<Server, ServerError>
where
    G: PaymentGateway + Send + Sync + 'static,
{
    // Event plumbing: the notification hooks subscribe before any producer is handed out, then the handlers run
    // for the lifetime of the process.
    let handlers = EventHandlers::new(100, create_notification_hooks(db.clone()));
    let producers = handlers.producers();
    tokio::spawn(handlers.start_handlers());

    let pricing = config.pricing;
    let delivery_fees = config.delivery_fees;
    let srv = HttpServer::new(move || {
        let order_flow = OrderFlowApi::new(db.clone(), gateway.clone(), pricing, producers.clone());
        let dispatch = DispatchApi::new(db.clone(), delivery_fees, producers.clone());
        let settlement = SettlementApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("soko::access_log"))
            .app_data(web::Data::new(order_flow))
            .app_data(web::Data::new(dispatch))
            .app_data(web::Data::new(settlement))
            .configure(configure_routes::<G>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

pub fn configure_routes<G: PaymentGateway + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(routes::health)
        .service(
            web::resource("/orders")
                .route(web::post().to(routes::place_order::<G>))
                .route(web::get().to(routes::my_orders::<G>)),
        )
        .service(web::resource("/bulk-orders").route(web::post().to(routes::place_bulk_order::<G>)))
        .service(web::resource("/orders/selling").route(web::get().to(routes::selling_orders::<G>)))
        .service(web::resource("/orders/{id}/status").route(web::get().to(routes::order_status::<G>)))
        .service(web::resource("/orders/{id}/accept").route(web::post().to(routes::accept_order)))
        .service(web::resource("/orders/{id}/pickup").route(web::post().to(routes::confirm_pickup)))
        .service(web::resource("/orders/{id}/deliver").route(web::post().to(routes::confirm_delivery)))
        .service(web::resource("/payments/mpesa/callback").route(web::post().to(routes::mpesa_callback::<G>)))
        .service(web::resource("/tasks/available").route(web::get().to(routes::available_tasks)))
        .service(web::resource("/tasks/mine").route(web::get().to(routes::my_tasks)))
        .service(web::resource("/tasks/earnings").route(web::get().to(routes::earnings)))
        .service(web::resource("/tasks/{id}/claim").route(web::post().to(routes::claim_task)))
        .service(web::resource("/admin/escrow").route(web::get().to(routes::escrow)));
}
