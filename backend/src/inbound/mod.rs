//! Inbound adapters that translate external requests into domain service
//! calls while keeping framework details at the edge.
//!
//! HTTP handlers live under [`http`]; the maintenance sweeps are driven by
//! the scheduler and the `run-sweep` binary instead.

pub mod http;
