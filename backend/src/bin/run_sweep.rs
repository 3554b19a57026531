//! Run one maintenance sweep against PostgreSQL and exit.
//!
//! Row-level failures are logged and reported but do not fail the process;
//! only a fatal failure (settings, connectivity, candidate selection) exits
//! non-zero.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use delivery_backend::domain::{SweepJob, UnknownSweepJob};
use delivery_backend::outbound::persistence::{
    DbPool, DieselDriverAvailabilityRepository, DieselOrderRepository, PoolConfig,
};
use delivery_backend::server::{AppSettings, StorageBackend, build_services};

/// `run-sweep` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "run-sweep",
    about = "Run one maintenance sweep and print its report",
    version
)]
struct CliArgs {
    /// Job to run: expire-unconfirmed, archive-completed, or
    /// expire-stale-availability.
    #[arg(value_name = "job", value_parser = parse_job)]
    job: SweepJob,
    /// Database connection URL. Falls back to `DELIVERY_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

fn parse_job(raw: &str) -> Result<SweepJob, UnknownSweepJob> {
    raw.parse()
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to create Tokio runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: CliArgs) -> Result<()> {
    // Flags belong to clap; settings come from the environment and files only.
    let mut settings = AppSettings::load_from_iter([OsString::from("run-sweep")])
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    if args.database_url.is_some() {
        settings.database_url = args.database_url;
        settings.in_memory = false;
    }
    let maintenance = settings.maintenance_config()?;
    let (database_url, pool_max_size) = match settings.storage()? {
        StorageBackend::Postgres {
            database_url,
            pool_max_size,
        } => (database_url, pool_max_size),
        StorageBackend::InMemory => {
            return Err(eyre!(
                "run-sweep needs PostgreSQL; in-memory storage has nothing to sweep"
            ));
        }
    };

    let pool = DbPool::new(PoolConfig::new(database_url).with_max_size(pool_max_size))
        .await
        .wrap_err("failed to build the connection pool")?;
    let bundle = build_services(
        Arc::new(DieselOrderRepository::new(pool.clone())),
        Arc::new(DieselDriverAvailabilityRepository::new(pool)),
        Arc::new(DefaultClock),
        maintenance,
    );

    let report = bundle
        .maintenance
        .run(args.job)
        .await
        .map_err(|err| eyre!("{} sweep failed: {err}", args.job))?;
    println!(
        "{}",
        serde_json::to_string(&report).wrap_err("failed to encode sweep report")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("expire-unconfirmed", SweepJob::ExpireUnconfirmed)]
    #[case("archive-completed", SweepJob::ArchiveCompleted)]
    #[case("expire-stale-availability", SweepJob::ExpireStaleAvailability)]
    fn parses_each_job_name(#[case] raw: &str, #[case] expected: SweepJob) {
        let args = CliArgs::try_parse_from(["run-sweep", raw]).expect("valid job");
        assert_eq!(args.job, expected);
        assert!(args.database_url.is_none());
    }

    #[rstest]
    fn rejects_unknown_jobs() {
        assert!(CliArgs::try_parse_from(["run-sweep", "vacuum"]).is_err());
    }

    #[rstest]
    fn accepts_a_database_url_flag() {
        let args = CliArgs::try_parse_from([
            "run-sweep",
            "archive-completed",
            "--database-url",
            "postgres://localhost/delivery",
        ])
        .expect("valid arguments");
        assert_eq!(
            args.database_url.as_deref(),
            Some("postgres://localhost/delivery")
        );
    }
}
