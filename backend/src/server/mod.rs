//! Server construction and process wiring.
//!
//! Shared by the `delivery-backend` server and the `run-sweep` binary: both
//! load [`AppSettings`] and build services with [`build_services`].

mod config;
mod state_builders;

pub use config::{AppSettings, SettingsError, StorageBackend};
pub use state_builders::{ServiceBundle, build_services};

use std::net::SocketAddr;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::domain::MaintenanceScheduler;
use crate::domain::ports::{DriverAvailabilityRepository, OrderRepository};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::{RequestTrace, configure_api};

/// Assemble the application: probes, the versioned API, and Swagger UI in
/// debug builds.
pub fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(RequestTrace)
        .configure(configure_api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Bind an Actix HTTP server and mark the health state ready.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    http_state: HttpState,
    bind_addr: SocketAddr,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let http_state = web::Data::new(http_state);
    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone())
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    info!(%bind_addr, "http server listening");
    Ok(server)
}

/// Run the HTTP server and the sweep timers until the server stops.
///
/// Liveness fails as soon as the server returns, and the timers are stopped
/// before this function does.
///
/// # Errors
/// Propagates [`std::io::Error`] from binding or running the server.
pub async fn serve<O, A>(bundle: ServiceBundle<O, A>, bind_addr: SocketAddr) -> std::io::Result<()>
where
    O: OrderRepository + 'static,
    A: DriverAvailabilityRepository + 'static,
{
    let ServiceBundle {
        http_state,
        maintenance,
    } = bundle;
    let health_state = web::Data::new(HealthState::new());
    let scheduler = MaintenanceScheduler::new(maintenance).spawn();

    let outcome = match create_server(health_state.clone(), http_state, bind_addr) {
        Ok(server) => server.await,
        Err(err) => Err(err),
    };

    health_state.mark_unhealthy();
    scheduler.shutdown().await;
    outcome
}
