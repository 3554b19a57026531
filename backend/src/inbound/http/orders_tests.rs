//! Tests for order lifecycle HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use mockall::predicate::{always, eq};
use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{MockOrderAssignment, MockOrderLifecycle};
use crate::domain::{Error, OrderStatus};
use crate::test_support::{at_hm, driver_id, order_id, order_in_status, user_id};

fn test_app(
    state: HttpState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .configure(crate::inbound::http::configure_api)
}

fn with_assignment(mock: MockOrderAssignment) -> HttpState {
    HttpState::default().with_assignment(Arc::new(mock))
}

fn with_lifecycle(mock: MockOrderLifecycle) -> HttpState {
    HttpState::default().with_lifecycle(Arc::new(mock))
}

fn assigned_to(driver: i64) -> Order {
    let mut order = order_in_status(1, OrderStatus::Assigned, at_hm(9, 0));
    order.driver_id = Some(driver_id(driver));
    order
}

#[actix_web::test]
async fn claim_returns_the_assigned_order() {
    let mut mock = MockOrderAssignment::new();
    mock.expect_claim()
        .with(eq(order_id(1)), eq(driver_id(7)))
        .times(1)
        .return_once(|_, _| Ok(assigned_to(7)));
    let app = actix_test::init_service(test_app(with_assignment(mock))).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/orders/1/claim")
        .set_json(json!({"driverId": 7}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["status"], "assigned");
    assert_eq!(body["driverId"], 7);
}

#[actix_web::test]
async fn losing_claim_is_a_conflict_with_a_machine_readable_reason() {
    let mut mock = MockOrderAssignment::new();
    mock.expect_claim().return_once(|_, _| {
        Err(Error::conflict("order 1 is no longer available to claim")
            .with_details(json!({"reason": "already_claimed"})))
    });
    let app = actix_test::init_service(test_app(with_assignment(mock))).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/orders/1/claim")
        .set_json(json!({"driverId": 9}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["code"], "conflict");
    assert_eq!(body["details"]["reason"], "already_claimed");
}

#[rstest]
#[case(json!({"driverId": 0}))]
#[case(json!({"driver": 7}))]
#[actix_web::test]
async fn malformed_claims_never_reach_the_port(#[case] payload: Value) {
    let app = actix_test::init_service(test_app(with_assignment(MockOrderAssignment::new()))).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/orders/1/claim")
        .set_json(payload)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["code"], "invalid_request");
}

#[actix_web::test]
async fn transition_forwards_target_actor_and_reason() {
    let mut mock = MockOrderLifecycle::new();
    mock.expect_apply_transition()
        .withf(|request| {
            request.order_id == order_id(1)
                && request.target == OrderStatus::Cancelled
                && request.actor == Actor::User(user_id(3))
                && request.reason.as_deref() == Some("kitchen closed")
        })
        .times(1)
        .return_once(|_| Ok(order_in_status(1, OrderStatus::Cancelled, at_hm(9, 0))));
    let app = actix_test::init_service(test_app(with_lifecycle(mock))).await;

    let request = actix_test::TestRequest::patch()
        .uri("/api/v1/orders/1/status")
        .set_json(json!({"status": "cancelled", "reason": "kitchen closed", "actorId": 3}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["status"], "cancelled");
    assert!(body["cancelledAt"].is_string());
}

#[actix_web::test]
async fn disallowed_transition_is_unprocessable() {
    let mut mock = MockOrderLifecycle::new();
    mock.expect_apply_transition().return_once(|_| {
        Err(Error::invalid_state_transition(
            "order 1 cannot move from pending to delivered",
        ))
    });
    let app = actix_test::init_service(test_app(with_lifecycle(mock))).await;

    let request = actix_test::TestRequest::patch()
        .uri("/api/v1/orders/1/status")
        .set_json(json!({"status": "delivered", "actorId": 3}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn unknown_status_names_are_rejected() {
    let app = actix_test::init_service(test_app(with_lifecycle(MockOrderLifecycle::new()))).await;

    let request = actix_test::TestRequest::patch()
        .uri("/api/v1/orders/1/status")
        .set_json(json!({"status": "teleported", "actorId": 3}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["details"]["field"], "status");
}

#[actix_web::test]
async fn reassignment_uses_the_admin_route() {
    let mut mock = MockOrderLifecycle::new();
    mock.expect_reassign_driver()
        .with(eq(order_id(1)), eq(driver_id(9)), eq(Actor::User(user_id(2))))
        .times(1)
        .return_once(|_, _, _| Ok(assigned_to(9)));
    let app = actix_test::init_service(test_app(with_lifecycle(mock))).await;

    let request = actix_test::TestRequest::put()
        .uri("/api/v1/admin/orders/1/driver")
        .set_json(json!({"driverId": 9, "actorId": 2}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["driverId"], 9);
}

#[actix_web::test]
async fn claimable_listing_defaults_to_twenty_rows() {
    let mut mock = MockOrderAssignment::new();
    mock.expect_list_claimable()
        .with(eq(20))
        .times(1)
        .return_once(|_| Ok(vec![order_in_status(4, OrderStatus::Ready, at_hm(9, 0))]));
    let app = actix_test::init_service(test_app(with_assignment(mock))).await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/orders/claimable")
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["id"], 4);
}

#[actix_web::test]
async fn claimable_listing_rejects_oversized_pages() {
    let app = actix_test::init_service(test_app(with_assignment(MockOrderAssignment::new()))).await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/orders/claimable?limit=500")
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn history_reports_system_changes_without_an_actor() {
    let mut mock = MockOrderLifecycle::new();
    mock.expect_history()
        .with(eq(order_id(1)))
        .return_once(|order| {
            Ok(vec![
                StatusHistoryEntry {
                    id: 1,
                    order_id: order,
                    from_status: None,
                    to_status: OrderStatus::Pending,
                    actor: Actor::User(user_id(500)),
                    note: None,
                    recorded_at: at_hm(9, 0),
                },
                StatusHistoryEntry {
                    id: 2,
                    order_id: order,
                    from_status: Some(OrderStatus::Pending),
                    to_status: OrderStatus::Cancelled,
                    actor: Actor::System,
                    note: Some("vendor no-response timeout".to_owned()),
                    recorded_at: at_hm(9, 31),
                },
            ])
        });
    let app = actix_test::init_service(test_app(with_lifecycle(mock))).await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/orders/1/history")
        .to_request();
    let body: Value = actix_test::call_and_read_body_json(&app, request).await;

    assert_eq!(body[0]["fromStatus"], Value::Null);
    assert_eq!(body[0]["actorUserId"], 500);
    assert_eq!(body[1]["actorUserId"], Value::Null);
    assert_eq!(body[1]["note"], "vendor no-response timeout");
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
    let mut mock = MockOrderLifecycle::new();
    mock.expect_get_order()
        .with(always())
        .return_once(|id| Err(Error::not_found(format!("order {id} not found"))));
    let app = actix_test::init_service(test_app(with_lifecycle(mock))).await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/orders/99")
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn store_outages_are_service_unavailable() {
    let mut mock = MockOrderAssignment::new();
    mock.expect_claim()
        .return_once(|_, _| Err(Error::service_unavailable("order store unavailable")));
    let app = actix_test::init_service(test_app(with_assignment(mock))).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/orders/1/claim")
        .set_json(json!({"driverId": 7}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
