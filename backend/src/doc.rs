//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint from the inbound layer together
//! with the schema wrappers from [`crate::inbound::http::schemas`], so domain
//! types stay free of utoipa derives. Swagger UI serves the document in debug
//! builds.

use utoipa::OpenApi;

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema, OrderStatusSchema};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Delivery order lifecycle API",
        description = "Order status transitions, driver self-claim, driver availability, and health probes."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::orders::list_claimable,
        crate::inbound::http::orders::get_order,
        crate::inbound::http::orders::order_history,
        crate::inbound::http::orders::claim_order,
        crate::inbound::http::orders::transition_order,
        crate::inbound::http::orders::reassign_driver,
        crate::inbound::http::drivers::heartbeat,
        crate::inbound::http::drivers::go_offline,
        crate::inbound::http::drivers::driver_availability,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema, OrderStatusSchema)),
    tags(
        (name = "orders", description = "Order status changes and driver claims"),
        (name = "admin", description = "Operator overrides"),
        (name = "drivers", description = "Driver availability"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
