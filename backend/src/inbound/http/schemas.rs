//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. The
//! wrappers here mirror their shape for utoipa's external schema
//! registration.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// The referenced order or driver does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// A guarded write lost to a concurrent change, e.g. an order that was
    /// already claimed.
    #[schema(rename = "conflict")]
    Conflict,
    /// The requested status is not a permitted successor.
    #[schema(rename = "invalid_state_transition")]
    InvalidStateTransition,
    /// The backing store could not be reached.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "conflict")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "order 42 is no longer available to claim")]
    message: String,
    /// Supplementary error details, e.g. `{"reason": "already_claimed"}`.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::OrderStatus`].
#[derive(ToSchema)]
#[schema(as = crate::domain::OrderStatus)]
pub enum OrderStatusSchema {
    #[schema(rename = "pending")]
    Pending,
    #[schema(rename = "confirmed")]
    Confirmed,
    #[schema(rename = "preparing")]
    Preparing,
    #[schema(rename = "ready")]
    Ready,
    #[schema(rename = "assigned")]
    Assigned,
    #[schema(rename = "in_transit")]
    InTransit,
    #[schema(rename = "delivered")]
    Delivered,
    #[schema(rename = "cancelled")]
    Cancelled,
}
