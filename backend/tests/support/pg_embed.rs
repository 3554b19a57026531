//! Embedded PostgreSQL for the Diesel adapter suites.
//!
//! Each test context gets its own temporary database on the process-wide
//! cluster from `pg-embed-setup-unpriv`, migrated with the backend's embedded
//! migrations so the schema under test is the one the server applies.
//!
//! Set `SKIP_TEST_CLUSTER=1` to skip these suites where the cluster cannot
//! start; otherwise a setup failure fails the test.

use std::time::Duration;

use delivery_backend::outbound::persistence::apply_pending_migrations;
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};

/// Attempts made to bring up the shared cluster.
const CLUSTER_RETRIES: usize = 5;

/// Pause between cluster bootstrap attempts.
const CLUSTER_RETRY_DELAY: Duration = Duration::from_millis(500);

fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(err) if attempt < CLUSTER_RETRIES => {
                eprintln!("pg-embed: attempt {attempt}/{CLUSTER_RETRIES} failed, retrying: {err}");
                std::thread::sleep(CLUSTER_RETRY_DELAY);
                attempt += 1;
            }
            Err(err) => return Err(err.to_string()),
        }
    }
}

/// Create a fresh database on the shared cluster and apply every migration.
pub fn migrated_database() -> Result<TemporaryDatabase, String> {
    let cluster = shared_cluster()?;
    let name = format!("test_{}", uuid::Uuid::new_v4().simple());
    let database = cluster
        .temporary_database(name.as_str())
        .map_err(|err| format!("create database: {err:?}"))?;
    apply_pending_migrations(database.url()).map_err(|err| err.to_string())?;
    Ok(database)
}

/// Returns true when `SKIP_TEST_CLUSTER` is set to "1", "true", or "yes".
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip marker when skipping is enabled; otherwise panic so CI breakage is
/// not masked.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
