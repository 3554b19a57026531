//! Order lifecycle and fulfilment assignment backend.
//!
//! - `domain`: order state machine, assignment coordinator, availability,
//!   and maintenance sweeps behind repository ports.
//! - `inbound`: HTTP adapter.
//! - `outbound`: in-memory and PostgreSQL store adapters.
//! - `server`: settings and process wiring shared by the binaries.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
