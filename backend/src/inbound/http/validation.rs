//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every helper turns malformed input into an `invalid_request` error whose
//! details name the offending field, before any domain call is made.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::{Error, IdentifierValidationError, OrderStatus};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidIdentifier,
    InvalidStatus,
    InvalidTimestamp,
    OutOfRange,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidIdentifier => "invalid_identifier",
            ErrorCode::InvalidStatus => "invalid_status",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::OutOfRange => "out_of_range",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn invalid(field: FieldName, code: ErrorCode, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "code": code.as_str(),
    }))
}

/// Wrap a raw identifier with one of the domain's positive id constructors.
pub(crate) fn parse_identifier<T>(
    raw: i64,
    field: FieldName,
    construct: impl FnOnce(i64) -> Result<T, IdentifierValidationError>,
) -> Result<T, Error> {
    construct(raw).map_err(|err| invalid(field, ErrorCode::InvalidIdentifier, err.to_string()))
}

/// Parse an order status by its wire name.
pub(crate) fn parse_status(raw: &str, field: FieldName) -> Result<OrderStatus, Error> {
    raw.parse()
        .map_err(|_| invalid(field, ErrorCode::InvalidStatus, format!("unknown order status: {raw}")))
}

/// Parse an optional RFC 3339 timestamp.
pub(crate) fn parse_optional_rfc3339_timestamp(
    raw: Option<String>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(&value)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|_| {
                invalid(
                    field,
                    ErrorCode::InvalidTimestamp,
                    format!("{} must be an RFC 3339 timestamp", field.as_str()),
                )
            })
    })
    .transpose()
}

/// Check a page size against an inclusive upper bound.
pub(crate) fn parse_limit(raw: Option<i64>, default: i64, max: i64) -> Result<i64, Error> {
    let limit = raw.unwrap_or(default);
    if !(1..=max).contains(&limit) {
        return Err(invalid(
            FieldName::new("limit"),
            ErrorCode::OutOfRange,
            format!("limit must be between 1 and {max}"),
        ));
    }
    Ok(limit)
}
