//! Backend entry-point: loads settings, selects storage, and runs the HTTP
//! server alongside the maintenance timers.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use delivery_backend::outbound::memory::{
    InMemoryDriverAvailabilityRepository, InMemoryOrderRepository,
};
use delivery_backend::outbound::persistence::{
    DbPool, DieselDriverAvailabilityRepository, DieselOrderRepository, PoolConfig,
    run_migrations,
};
use delivery_backend::server::{AppSettings, StorageBackend, build_services, serve};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().map_err(|err| eyre!("failed to load settings: {err}"))?;
    let bind_addr = settings.bind_addr()?;
    let maintenance = settings.maintenance_config()?;
    let clock = Arc::new(DefaultClock);

    match settings.storage()? {
        StorageBackend::InMemory => {
            warn!("serving from process memory; orders are lost on exit");
            let bundle = build_services(
                Arc::new(InMemoryOrderRepository::new()),
                Arc::new(InMemoryDriverAvailabilityRepository::new()),
                clock,
                maintenance,
            );
            serve(bundle, bind_addr).await?;
        }
        StorageBackend::Postgres {
            database_url,
            pool_max_size,
        } => {
            run_migrations(database_url.clone())
                .await
                .wrap_err("failed to migrate the database")?;
            let pool = DbPool::new(PoolConfig::new(database_url).with_max_size(pool_max_size))
                .await
                .wrap_err("failed to build the connection pool")?;
            let bundle = build_services(
                Arc::new(DieselOrderRepository::new(pool.clone())),
                Arc::new(DieselDriverAvailabilityRepository::new(pool)),
                clock,
                maintenance,
            );
            serve(bundle, bind_addr).await?;
        }
    }

    info!("server stopped");
    Ok(())
}
