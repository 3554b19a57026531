//! Outbound adapters implementing the store ports.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM.
//! - **memory**: in-process repositories with the same conditional-write
//!   semantics, used by tests and the local in-memory server mode.
//!
//! Adapters translate between domain records and storage representations.
//! They contain no lifecycle rules beyond restating the precondition each
//! write request carries.

pub mod memory;
pub mod persistence;
