//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the order and availability ports backed by
//! PostgreSQL through `diesel-async` and a `bb8` pool.
//!
//! - Row structs (`models.rs`) and table definitions (`schema.rs`) stay
//!   private to this module; adapters convert rows into validated domain
//!   records.
//! - Every guarded write is a single conditional statement. History rows are
//!   written in the same transaction as the change they describe.
//!
//! # Example
//!
//! ```no_run
//! # async fn connect() -> Result<(), Box<dyn std::error::Error>> {
//! use delivery_backend::outbound::persistence::{
//!     DbPool, DieselOrderRepository, PoolConfig,
//! };
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/orders")).await?;
//! let orders = DieselOrderRepository::new(pool);
//! # let _ = orders;
//! # Ok(())
//! # }
//! ```

mod diesel_basic_error_mapping;
mod diesel_driver_availability_repository;
mod diesel_order_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_driver_availability_repository::DieselDriverAvailabilityRepository;
pub use diesel_order_repository::DieselOrderRepository;
pub use migrations::{MigrationError, apply_pending_migrations, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
