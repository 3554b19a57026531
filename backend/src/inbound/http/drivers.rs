//! Driver availability HTTP handlers.
//!
//! ```text
//! POST /api/v1/drivers/{driverId}/heartbeat     Mark available, record time
//! POST /api/v1/drivers/{driverId}/offline       Mark unavailable
//! GET  /api/v1/drivers/{driverId}/availability  Current availability row
//! ```

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{DriverAvailability, DriverId, OrderId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_identifier, parse_optional_rfc3339_timestamp,
};

/// Optional heartbeat payload. The server clock is used when `at` is absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequestBody {
    #[schema(format = "date-time")]
    pub at: Option<String>,
}

/// Driver availability row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DriverAvailabilityBody {
    pub driver_id: i64,
    pub is_available: bool,
    #[schema(format = "date-time")]
    pub last_heartbeat_at: String,
    pub current_order_id: Option<i64>,
}

impl From<DriverAvailability> for DriverAvailabilityBody {
    fn from(value: DriverAvailability) -> Self {
        Self {
            driver_id: value.driver_id.get(),
            is_available: value.is_available,
            last_heartbeat_at: value.last_heartbeat_at.to_rfc3339(),
            current_order_id: value.current_order_id.map(OrderId::get),
        }
    }
}

fn driver_id_from_path(path: web::Path<i64>) -> ApiResult<DriverId> {
    parse_identifier(path.into_inner(), FieldName::new("driverId"), DriverId::new)
}

/// Record a driver heartbeat.
#[utoipa::path(
    post,
    path = "/api/v1/drivers/{driverId}/heartbeat",
    params(("driverId" = i64, Path, description = "Driver sending the heartbeat")),
    request_body(content = Option<HeartbeatRequestBody>, description = "Optional client timestamp"),
    responses(
        (status = 200, description = "Heartbeat recorded", body = DriverAvailabilityBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["drivers"],
    operation_id = "driverHeartbeat"
)]
#[post("/drivers/{driver_id}/heartbeat")]
pub async fn heartbeat(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
    payload: Option<web::Json<HeartbeatRequestBody>>,
) -> ApiResult<web::Json<DriverAvailabilityBody>> {
    let driver_id = driver_id_from_path(path)?;
    let body = payload.map(web::Json::into_inner).unwrap_or_default();
    let at = parse_optional_rfc3339_timestamp(body.at, FieldName::new("at"))?;
    let record = state.availability.heartbeat(driver_id, at).await?;
    Ok(web::Json(record.into()))
}

/// Mark a driver unavailable.
#[utoipa::path(
    post,
    path = "/api/v1/drivers/{driverId}/offline",
    params(("driverId" = i64, Path, description = "Driver going offline")),
    responses(
        (status = 200, description = "Driver marked unavailable", body = DriverAvailabilityBody),
        (status = 404, description = "Driver never sent a heartbeat", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["drivers"],
    operation_id = "driverOffline"
)]
#[post("/drivers/{driver_id}/offline")]
pub async fn go_offline(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<web::Json<DriverAvailabilityBody>> {
    let record = state
        .availability
        .go_offline(driver_id_from_path(path)?)
        .await?;
    Ok(web::Json(record.into()))
}

/// Fetch a driver's availability row.
#[utoipa::path(
    get,
    path = "/api/v1/drivers/{driverId}/availability",
    params(("driverId" = i64, Path, description = "Driver to inspect")),
    responses(
        (status = 200, description = "Availability row", body = DriverAvailabilityBody),
        (status = 404, description = "Driver never sent a heartbeat", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["drivers"],
    operation_id = "driverAvailability"
)]
#[get("/drivers/{driver_id}/availability")]
pub async fn driver_availability(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<web::Json<DriverAvailabilityBody>> {
    let record = state.availability.get(driver_id_from_path(path)?).await?;
    Ok(web::Json(record.into()))
}
