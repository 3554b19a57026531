//! Order lifecycle HTTP handlers.
//!
//! ```text
//! GET   /api/v1/orders/claimable           Ready, unassigned orders
//! GET   /api/v1/orders/{orderId}           Current order record
//! GET   /api/v1/orders/{orderId}/history   Status history, oldest first
//! POST  /api/v1/orders/{orderId}/claim     Driver self-assignment
//! PATCH /api/v1/orders/{orderId}/status    Vendor or driver transition
//! PUT   /api/v1/admin/orders/{orderId}/driver  Administrative reassignment
//! ```

use actix_web::{get, patch, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::assignment_service::MAX_CLAIMABLE_PAGE;
use crate::domain::ports::TransitionRequest;
use crate::domain::{Actor, DriverId, Order, OrderId, OrderTotals, StatusHistoryEntry, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, OrderStatusSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_identifier, parse_limit, parse_status};

const DEFAULT_CLAIMABLE_PAGE: i64 = 20;

fn rfc3339(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|at| at.to_rfc3339())
}

/// Monetary totals in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotalsBody {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub delivery_fee_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl From<OrderTotals> for OrderTotalsBody {
    fn from(value: OrderTotals) -> Self {
        Self {
            subtotal_cents: value.subtotal_cents,
            tax_cents: value.tax_cents,
            delivery_fee_cents: value.delivery_fee_cents,
            discount_cents: value.discount_cents,
            total_cents: value.total_cents,
        }
    }
}

/// Order record returned by every order endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponseBody {
    pub id: i64,
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub driver_id: Option<i64>,
    #[schema(value_type = OrderStatusSchema)]
    pub status: String,
    pub totals: OrderTotalsBody,
    #[schema(format = "date-time")]
    pub placed_at: Option<String>,
    #[schema(format = "date-time")]
    pub confirmed_at: Option<String>,
    #[schema(format = "date-time")]
    pub ready_at: Option<String>,
    #[schema(format = "date-time")]
    pub picked_up_at: Option<String>,
    #[schema(format = "date-time")]
    pub delivered_at: Option<String>,
    #[schema(format = "date-time")]
    pub cancelled_at: Option<String>,
    pub cancellation_reason: Option<String>,
    #[schema(format = "date-time")]
    pub archived_at: Option<String>,
}

impl From<Order> for OrderResponseBody {
    fn from(value: Order) -> Self {
        let Order {
            id,
            customer_id,
            restaurant_id,
            driver_id,
            status,
            totals,
            timestamps,
            cancellation_reason,
            archived_at,
        } = value;
        Self {
            id: id.get(),
            customer_id: customer_id.get(),
            restaurant_id: restaurant_id.get(),
            driver_id: driver_id.map(DriverId::get),
            status: status.as_str().to_owned(),
            totals: totals.into(),
            placed_at: rfc3339(timestamps.placed_at),
            confirmed_at: rfc3339(timestamps.confirmed_at),
            ready_at: rfc3339(timestamps.ready_at),
            picked_up_at: rfc3339(timestamps.picked_up_at),
            delivered_at: rfc3339(timestamps.delivered_at),
            cancelled_at: rfc3339(timestamps.cancelled_at),
            cancellation_reason,
            archived_at: rfc3339(archived_at),
        }
    }
}

/// One status history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntryBody {
    pub id: i64,
    /// Absent for the placement row.
    #[schema(value_type = Option<OrderStatusSchema>)]
    pub from_status: Option<String>,
    #[schema(value_type = OrderStatusSchema)]
    pub to_status: String,
    /// Absent when a maintenance sweep made the change.
    pub actor_user_id: Option<i64>,
    pub note: Option<String>,
    #[schema(format = "date-time")]
    pub recorded_at: String,
}

impl From<StatusHistoryEntry> for StatusHistoryEntryBody {
    fn from(value: StatusHistoryEntry) -> Self {
        Self {
            id: value.id,
            from_status: value.from_status.map(|status| status.as_str().to_owned()),
            to_status: value.to_status.as_str().to_owned(),
            actor_user_id: value.actor.user_id().map(UserId::get),
            note: value.note,
            recorded_at: value.recorded_at.to_rfc3339(),
        }
    }
}

/// Request payload for claiming an order.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOrderRequestBody {
    pub driver_id: i64,
}

/// Request payload for a status transition.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequestBody {
    /// Target status.
    #[schema(value_type = OrderStatusSchema)]
    pub status: String,
    /// Required when cancelling; stored as a history note otherwise.
    pub reason: Option<String>,
    /// User performing the transition.
    pub actor_id: i64,
}

/// Request payload for an administrative driver reassignment.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReassignDriverRequestBody {
    pub driver_id: i64,
    /// Administrator performing the reassignment.
    pub actor_id: i64,
}

/// Pagination for the claimable listing.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClaimableQuery {
    /// Page size, 1 to 100. Defaults to 20.
    pub limit: Option<i64>,
}

fn order_id_from_path(path: web::Path<i64>) -> ApiResult<OrderId> {
    parse_identifier(path.into_inner(), FieldName::new("orderId"), OrderId::new)
}

/// Claim a ready, unassigned order for a driver.
///
/// Exactly one of any number of concurrent claims on the same order
/// succeeds. The others receive `409` with `details.reason` set to
/// `already_claimed` and should re-poll the claimable listing.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{orderId}/claim",
    params(("orderId" = i64, Path, description = "Order to claim")),
    request_body = ClaimOrderRequestBody,
    responses(
        (status = 200, description = "Order claimed", body = OrderResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Order not found", body = ErrorSchema),
        (status = 409, description = "Order already claimed", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["orders"],
    operation_id = "claimOrder"
)]
#[post("/orders/{order_id}/claim")]
pub async fn claim_order(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
    payload: web::Json<ClaimOrderRequestBody>,
) -> ApiResult<web::Json<OrderResponseBody>> {
    let order_id = order_id_from_path(path)?;
    let driver_id = parse_identifier(
        payload.driver_id,
        FieldName::new("driverId"),
        DriverId::new,
    )?;
    let order = state.assignment.claim(order_id, driver_id).await?;
    Ok(web::Json(order.into()))
}

/// Move an order to a new status.
#[utoipa::path(
    patch,
    path = "/api/v1/orders/{orderId}/status",
    params(("orderId" = i64, Path, description = "Order to update")),
    request_body = TransitionRequestBody,
    responses(
        (status = 200, description = "Status changed", body = OrderResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Order not found", body = ErrorSchema),
        (status = 409, description = "Order changed concurrently", body = ErrorSchema),
        (status = 422, description = "Transition not permitted", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["orders"],
    operation_id = "transitionOrder"
)]
#[patch("/orders/{order_id}/status")]
pub async fn transition_order(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
    payload: web::Json<TransitionRequestBody>,
) -> ApiResult<web::Json<OrderResponseBody>> {
    let order_id = order_id_from_path(path)?;
    let TransitionRequestBody {
        status,
        reason,
        actor_id,
    } = payload.into_inner();
    let request = TransitionRequest {
        order_id,
        target: parse_status(&status, FieldName::new("status"))?,
        actor: Actor::User(parse_identifier(
            actor_id,
            FieldName::new("actorId"),
            UserId::new,
        )?),
        reason,
    };
    let order = state.lifecycle.apply_transition(request).await?;
    Ok(web::Json(order.into()))
}

/// Replace the driver on a ready, assigned, or in-transit order.
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{orderId}/driver",
    params(("orderId" = i64, Path, description = "Order to reassign")),
    request_body = ReassignDriverRequestBody,
    responses(
        (status = 200, description = "Driver reassigned", body = OrderResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Order or driver not found", body = ErrorSchema),
        (status = 409, description = "Order changed concurrently", body = ErrorSchema),
        (status = 422, description = "Order cannot take a driver", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "reassignDriver"
)]
#[put("/admin/orders/{order_id}/driver")]
pub async fn reassign_driver(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
    payload: web::Json<ReassignDriverRequestBody>,
) -> ApiResult<web::Json<OrderResponseBody>> {
    let order_id = order_id_from_path(path)?;
    let driver_id = parse_identifier(
        payload.driver_id,
        FieldName::new("driverId"),
        DriverId::new,
    )?;
    let actor = Actor::User(parse_identifier(
        payload.actor_id,
        FieldName::new("actorId"),
        UserId::new,
    )?);
    let order = state
        .lifecycle
        .reassign_driver(order_id, driver_id, actor)
        .await?;
    Ok(web::Json(order.into()))
}

/// List ready, unassigned orders, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/orders/claimable",
    params(ClaimableQuery),
    responses(
        (status = 200, description = "Claimable orders", body = [OrderResponseBody]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["orders"],
    operation_id = "listClaimableOrders"
)]
#[get("/orders/claimable")]
pub async fn list_claimable(
    state: web::Data<HttpState>,
    query: web::Query<ClaimableQuery>,
) -> ApiResult<web::Json<Vec<OrderResponseBody>>> {
    let limit = parse_limit(query.limit, DEFAULT_CLAIMABLE_PAGE, MAX_CLAIMABLE_PAGE)?;
    let orders = state.assignment.list_claimable(limit).await?;
    Ok(web::Json(orders.into_iter().map(Into::into).collect()))
}

/// Fetch an order.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{orderId}",
    params(("orderId" = i64, Path, description = "Order to fetch")),
    responses(
        (status = 200, description = "Order", body = OrderResponseBody),
        (status = 404, description = "Order not found", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["orders"],
    operation_id = "getOrder"
)]
#[get("/orders/{order_id}")]
pub async fn get_order(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<web::Json<OrderResponseBody>> {
    let order = state.lifecycle.get_order(order_id_from_path(path)?).await?;
    Ok(web::Json(order.into()))
}

/// Status history of an order in the order the transitions happened.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{orderId}/history",
    params(("orderId" = i64, Path, description = "Order whose history to list")),
    responses(
        (status = 200, description = "History entries", body = [StatusHistoryEntryBody]),
        (status = 404, description = "Order not found", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["orders"],
    operation_id = "getOrderHistory"
)]
#[get("/orders/{order_id}/history")]
pub async fn order_history(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<web::Json<Vec<StatusHistoryEntryBody>>> {
    let entries = state.lifecycle.history(order_id_from_path(path)?).await?;
    Ok(web::Json(entries.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
#[path = "orders_tests.rs"]
mod tests;
