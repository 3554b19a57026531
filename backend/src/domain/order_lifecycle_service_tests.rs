//! Tests for the order state machine service.

use std::sync::Arc;

use chrono::TimeDelta;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    MockDriverAvailabilityRepository, MockOrderRepository, OrderRepositoryError,
};
use crate::domain::{DriverAvailability, ErrorCode};
use crate::test_support::{MutableClock, at_hm, driver_id, order_in_status, order_id, user_id};

type Service = OrderLifecycleService<MockOrderRepository, MockDriverAvailabilityRepository>;

#[fixture]
fn clock() -> Arc<MutableClock> {
    Arc::new(MutableClock::new(at_hm(10, 0)))
}

fn service(
    orders: MockOrderRepository,
    availability: MockDriverAvailabilityRepository,
    clock: Arc<MutableClock>,
) -> Service {
    OrderLifecycleService::new(Arc::new(orders), Arc::new(availability), clock)
}

fn request(target: OrderStatus, reason: Option<&str>) -> TransitionRequest {
    TransitionRequest {
        order_id: order_id(1),
        target,
        actor: Actor::User(user_id(42)),
        reason: reason.map(str::to_owned),
    }
}

fn stored(status: OrderStatus) -> Order {
    order_in_status(1, status, at_hm(9, 0))
}

#[rstest]
#[tokio::test]
async fn confirm_writes_guarded_change_stamped_by_clock(clock: Arc<MutableClock>) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(|_| Ok(Some(stored(OrderStatus::Pending))));
    orders
        .expect_apply_status_change()
        .times(1)
        .withf(|change| {
            change.from == OrderStatus::Pending
                && change.to == OrderStatus::Confirmed
                && change.at == at_hm(10, 0)
                && change.placed_before.is_none()
        })
        .returning(|change| {
            Ok(ConditionalWrite::Applied(
                stored(OrderStatus::Pending)
                    .applying(change)
                    .expect("guard holds"),
            ))
        });
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let order = svc
        .apply_transition(request(OrderStatus::Confirmed, None))
        .await
        .expect("transition succeeds");

    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.timestamps.confirmed_at, Some(at_hm(10, 0)));
}

#[rstest]
#[tokio::test]
async fn disallowed_transition_never_writes(clock: Arc<MutableClock>) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(|_| Ok(Some(stored(OrderStatus::Pending))));
    orders.expect_apply_status_change().times(0);
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .apply_transition(request(OrderStatus::Delivered, None))
        .await
        .expect_err("pending cannot jump to delivered");

    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
}

#[rstest]
#[case(OrderStatus::Delivered, OrderStatus::Cancelled)]
#[case(OrderStatus::Cancelled, OrderStatus::Confirmed)]
#[case(OrderStatus::Delivered, OrderStatus::InTransit)]
#[tokio::test]
async fn terminal_orders_reject_every_transition(
    clock: Arc<MutableClock>,
    #[case] current: OrderStatus,
    #[case] target: OrderStatus,
) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(stored(current))));
    orders.expect_apply_status_change().times(0);
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .apply_transition(request(target, Some("late change")))
        .await
        .expect_err("terminal order");

    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
}

#[rstest]
#[case(None)]
#[case(Some("   "))]
#[tokio::test]
async fn cancellation_without_reason_is_invalid(
    clock: Arc<MutableClock>,
    #[case] reason: Option<&str>,
) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(|_| Ok(Some(stored(OrderStatus::Pending))));
    orders.expect_apply_status_change().times(0);
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .apply_transition(request(OrderStatus::Cancelled, reason))
        .await
        .expect_err("reason required");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[case(OrderStatus::Delivered)]
#[case(OrderStatus::Cancelled)]
#[tokio::test]
async fn cancelling_a_terminal_order_is_a_state_error_even_without_reason(
    clock: Arc<MutableClock>,
    #[case] current: OrderStatus,
) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(stored(current))));
    orders.expect_apply_status_change().times(0);
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .apply_transition(request(OrderStatus::Cancelled, None))
        .await
        .expect_err("terminal order");

    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
}

#[rstest]
#[tokio::test]
async fn ready_orders_are_assigned_through_claim_only(clock: Arc<MutableClock>) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(|_| Ok(Some(stored(OrderStatus::Ready))));
    orders.expect_apply_status_change().times(0);
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .apply_transition(request(OrderStatus::Assigned, None))
        .await
        .expect_err("claim path only");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[case(OrderStatus::Pending)]
#[case(OrderStatus::Confirmed)]
#[case(OrderStatus::Preparing)]
#[case(OrderStatus::Assigned)]
#[case(OrderStatus::InTransit)]
#[case(OrderStatus::Delivered)]
#[case(OrderStatus::Cancelled)]
#[tokio::test]
async fn assigned_from_any_other_status_is_a_state_error(
    clock: Arc<MutableClock>,
    #[case] current: OrderStatus,
) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(stored(current))));
    orders.expect_apply_status_change().times(0);
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .apply_transition(request(OrderStatus::Assigned, None))
        .await
        .expect_err("not a permitted transition");

    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
}

#[rstest]
#[tokio::test]
async fn lost_race_surfaces_as_conflict(clock: Arc<MutableClock>) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(|_| Ok(Some(stored(OrderStatus::Preparing))));
    orders
        .expect_apply_status_change()
        .return_once(|_| Ok(ConditionalWrite::PreconditionFailed));
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .apply_transition(request(OrderStatus::Ready, None))
        .await
        .expect_err("concurrent change");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn unknown_order_is_not_found(clock: Arc<MutableClock>) {
    let mut orders = MockOrderRepository::new();
    orders.expect_find_by_id().return_once(|_| Ok(None));
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .apply_transition(request(OrderStatus::Confirmed, None))
        .await
        .expect_err("missing order");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn store_outage_maps_to_service_unavailable(clock: Arc<MutableClock>) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(|_| Err(OrderRepositoryError::connection("refused")));
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .apply_transition(request(OrderStatus::Confirmed, None))
        .await
        .expect_err("store down");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn guarded_transition_skips_orders_that_moved_on(clock: Arc<MutableClock>) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(|_| Ok(Some(stored(OrderStatus::Confirmed))));
    orders.expect_apply_status_change().times(0);
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .apply_guarded_transition(
            request(OrderStatus::Cancelled, Some("vendor no-response timeout")),
            TransitionGuard::expecting(OrderStatus::Pending),
            at_hm(10, 0),
        )
        .await
        .expect_err("vendor confirmed first");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn guarded_transition_restates_placement_cutoff(clock: Arc<MutableClock>) {
    let cutoff = at_hm(9, 30);
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(|_| Ok(Some(stored(OrderStatus::Pending))));
    orders
        .expect_apply_status_change()
        .withf(move |change| {
            change.placed_before == Some(cutoff)
                && change.at == at_hm(11, 5)
                && change.cancellation_reason.as_deref() == Some("vendor no-response timeout")
                && change.note.is_none()
        })
        .returning(|change| {
            Ok(ConditionalWrite::Applied(
                stored(OrderStatus::Pending)
                    .applying(change)
                    .expect("guard holds"),
            ))
        });
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let order = svc
        .apply_guarded_transition(
            request(OrderStatus::Cancelled, Some("vendor no-response timeout")),
            TransitionGuard {
                expected_current: OrderStatus::Pending,
                placed_before: Some(cutoff),
            },
            at_hm(11, 5),
        )
        .await
        .expect("sweep cancels");

    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.timestamps.cancelled_at, Some(at_hm(11, 5)));
    assert_eq!(
        order.cancellation_reason.as_deref(),
        Some("vendor no-response timeout")
    );
}

#[rstest]
#[tokio::test]
async fn delivery_releases_the_driver_best_effort(clock: Arc<MutableClock>) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(|_| Ok(Some(stored(OrderStatus::InTransit))));
    orders.expect_apply_status_change().returning(|change| {
        Ok(ConditionalWrite::Applied(
            stored(OrderStatus::InTransit)
                .applying(change)
                .expect("guard holds"),
        ))
    });
    let mut availability = MockDriverAvailabilityRepository::new();
    availability
        .expect_detach_order()
        .times(1)
        .withf(|driver, order| *driver == driver_id(7) && *order == order_id(1))
        .return_once(|_, _| {
            Err(crate::domain::ports::DriverAvailabilityRepositoryError::query(
                "row locked",
            ))
        });
    let svc = service(orders, availability, clock);

    let order = svc
        .apply_transition(request(OrderStatus::Delivered, None))
        .await
        .expect("delivery succeeds despite availability failure");

    assert_eq!(order.status, OrderStatus::Delivered);
}

#[rstest]
#[tokio::test]
async fn reassignment_promotes_ready_orders_and_tracks_driver(clock: Arc<MutableClock>) {
    let new_driver = driver_id(9);
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(|_| Ok(Some(stored(OrderStatus::Ready))));
    orders
        .expect_reassign_driver()
        .withf(move |r| r.from == OrderStatus::Ready && r.driver_id == new_driver)
        .returning(move |r| {
            let mut order = stored(OrderStatus::Ready);
            order.status = r.resulting_status();
            order.driver_id = Some(r.driver_id);
            Ok(ConditionalWrite::Applied(order))
        });
    let mut availability = MockDriverAvailabilityRepository::new();
    availability.expect_find().returning(move |driver| {
        Ok(Some(DriverAvailability::first_heartbeat(
            driver,
            at_hm(9, 55),
        )))
    });
    availability
        .expect_attach_order()
        .times(1)
        .returning(|driver, _| {
            Ok(ConditionalWrite::Applied(DriverAvailability::first_heartbeat(
                driver,
                at_hm(9, 55),
            )))
        });
    availability.expect_detach_order().times(0);
    let svc = service(orders, availability, clock);

    let order = svc
        .reassign_driver(order_id(1), new_driver, Actor::User(user_id(1)))
        .await
        .expect("reassignment succeeds");

    assert_eq!(order.status, OrderStatus::Assigned);
    assert_eq!(order.driver_id, Some(new_driver));
}

#[rstest]
#[case(OrderStatus::Pending)]
#[case(OrderStatus::Preparing)]
#[case(OrderStatus::Delivered)]
#[case(OrderStatus::Cancelled)]
#[tokio::test]
async fn reassignment_is_refused_outside_ready_and_in_flight(
    clock: Arc<MutableClock>,
    #[case] current: OrderStatus,
) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(stored(current))));
    orders.expect_reassign_driver().times(0);
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .reassign_driver(order_id(1), driver_id(9), Actor::User(user_id(1)))
        .await
        .expect_err("not reassignable");

    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
}

#[rstest]
#[tokio::test]
async fn archive_conflict_when_precondition_fails(clock: Arc<MutableClock>) {
    let mut orders = MockOrderRepository::new();
    orders
        .expect_archive()
        .withf(|_, cutoff, at| {
            *at == at_hm(11, 0) && *cutoff == at_hm(11, 0) - TimeDelta::days(90)
        })
        .return_once(|_, _, _| Ok(ConditionalWrite::PreconditionFailed));
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc
        .archive(order_id(1), at_hm(11, 0) - TimeDelta::days(90), at_hm(11, 0))
        .await
        .expect_err("already archived");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn history_of_unknown_order_is_not_found(clock: Arc<MutableClock>) {
    let mut orders = MockOrderRepository::new();
    orders.expect_find_by_id().return_once(|_| Ok(None));
    orders.expect_history().times(0);
    let svc = service(orders, MockDriverAvailabilityRepository::new(), clock);

    let err = svc.history(order_id(1)).await.expect_err("missing order");

    assert_eq!(err.code(), ErrorCode::NotFound);
}
