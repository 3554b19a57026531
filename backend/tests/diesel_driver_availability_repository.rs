//! Integration tests for `DieselDriverAvailabilityRepository` against
//! embedded PostgreSQL.
//!
//! Covers the heartbeat upsert, the stale-heartbeat expiry guard, and the
//! current-order bookkeeping that references real order rows.

use delivery_backend::domain::ports::{
    ConditionalWrite, DriverAvailabilityRepository, OrderRepository,
};
use delivery_backend::outbound::persistence::{
    DbPool, DieselDriverAvailabilityRepository, DieselOrderRepository, PoolConfig,
};
use delivery_backend::test_support::{at_hm, driver_id, new_order};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

#[path = "support/pg_embed.rs"]
mod pg_embed;

use pg_embed::{handle_cluster_setup_failure, migrated_database};

struct TestContext {
    runtime: Runtime,
    repository: DieselDriverAvailabilityRepository,
    orders: DieselOrderRepository,
    _database: TemporaryDatabase,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let database = migrated_database()?;
    let config = PoolConfig::new(database.url()).with_max_size(2);
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        repository: DieselDriverAvailabilityRepository::new(pool.clone()),
        orders: DieselOrderRepository::new(pool),
        _database: database,
    })
}

#[fixture]
fn repo_context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
fn heartbeats_upsert_a_single_row(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: heartbeats_upsert_a_single_row skipped");
        return;
    };
    let repository = &context.repository;
    let driver = driver_id(7);

    let first = context
        .runtime
        .block_on(repository.record_heartbeat(driver, at_hm(9, 0)))
        .expect("first heartbeat");
    assert!(first.is_available);
    assert_eq!(first.last_heartbeat_at, at_hm(9, 0));

    context
        .runtime
        .block_on(repository.set_unavailable(driver))
        .expect("go offline");
    let second = context
        .runtime
        .block_on(repository.record_heartbeat(driver, at_hm(9, 5)))
        .expect("second heartbeat");

    assert!(second.is_available);
    assert_eq!(second.last_heartbeat_at, at_hm(9, 5));
    let stored = context
        .runtime
        .block_on(repository.find(driver))
        .expect("lookup runs");
    assert_eq!(stored, Some(second));
}

#[rstest]
fn stale_expiry_yields_to_fresh_heartbeats(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: stale_expiry_yields_to_fresh_heartbeats skipped");
        return;
    };
    let repository = &context.repository;
    for (raw, minute) in [(1, 0), (2, 20)] {
        context
            .runtime
            .block_on(repository.record_heartbeat(driver_id(raw), at_hm(9, minute)))
            .expect("heartbeat");
    }
    let cutoff = at_hm(9, 10);

    let stale = context
        .runtime
        .block_on(repository.list_stale(cutoff, 10))
        .expect("selection runs");
    assert_eq!(stale, vec![driver_id(1)]);

    assert_eq!(
        context
            .runtime
            .block_on(repository.expire_if_stale(driver_id(2), cutoff))
            .expect("expiry runs"),
        ConditionalWrite::PreconditionFailed
    );
    let ConditionalWrite::Applied(expired) = context
        .runtime
        .block_on(repository.expire_if_stale(driver_id(1), cutoff))
        .expect("expiry runs")
    else {
        panic!("stale driver should expire");
    };
    assert!(!expired.is_available);
    assert_eq!(
        context
            .runtime
            .block_on(repository.expire_if_stale(driver_id(3), cutoff))
            .expect("expiry runs"),
        ConditionalWrite::Missing
    );
}

#[rstest]
fn detach_only_clears_the_matching_order(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: detach_only_clears_the_matching_order skipped");
        return;
    };
    let repository = &context.repository;
    let driver = driver_id(7);
    let (first, second) = context.runtime.block_on(async {
        let first = context.orders.insert(&new_order(at_hm(9, 0))).await;
        let second = context.orders.insert(&new_order(at_hm(9, 1))).await;
        (first.expect("insert order"), second.expect("insert order"))
    });
    context
        .runtime
        .block_on(repository.record_heartbeat(driver, at_hm(9, 0)))
        .expect("heartbeat");

    context
        .runtime
        .block_on(repository.attach_order(driver, second.id))
        .expect("attach runs");
    assert_eq!(
        context
            .runtime
            .block_on(repository.detach_order(driver, first.id))
            .expect("detach runs"),
        ConditionalWrite::PreconditionFailed
    );

    let ConditionalWrite::Applied(cleared) = context
        .runtime
        .block_on(repository.detach_order(driver, second.id))
        .expect("detach runs")
    else {
        panic!("matching order should clear");
    };
    assert_eq!(cleared.current_order_id, None);
}
