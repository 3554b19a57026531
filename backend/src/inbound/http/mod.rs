//! HTTP inbound adapter exposing REST endpoints.
//!
//! Handlers parse and validate input, call a driving port, and map the
//! outcome onto a status code. They never touch a store directly.

use actix_web::web;

pub mod drivers;
pub mod error;
pub mod health;
pub mod orders;
pub mod schemas;
pub mod state;
pub mod trace;
pub(crate) mod validation;

pub use error::ApiResult;
pub use trace::RequestTrace;

/// Register the versioned API and the extractor error handlers.
///
/// The claimable listing is registered ahead of `/orders/{order_id}` so the
/// literal segment wins.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::PathConfig::default().error_handler(error::path_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
        .service(
            web::scope("/api/v1")
                .service(orders::list_claimable)
                .service(orders::get_order)
                .service(orders::order_history)
                .service(orders::claim_order)
                .service(orders::transition_order)
                .service(orders::reassign_driver)
                .service(drivers::heartbeat)
                .service(drivers::go_offline)
                .service(drivers::driver_availability),
        );
}
