//! Diesel table definitions for the order lifecycle schema.
//!
//! These definitions must match `backend/migrations` exactly.

diesel::table! {
    /// One row per order.
    orders (id) {
        id -> Int8,
        customer_id -> Int8,
        restaurant_id -> Int8,
        /// Null until a driver claims the order.
        driver_id -> Nullable<Int8>,
        /// Lifecycle status as its snake_case wire name.
        status -> Text,
        subtotal_cents -> Int8,
        tax_cents -> Int8,
        delivery_fee_cents -> Int8,
        discount_cents -> Int8,
        total_cents -> Int8,
        placed_at -> Nullable<Timestamptz>,
        confirmed_at -> Nullable<Timestamptz>,
        ready_at -> Nullable<Timestamptz>,
        picked_up_at -> Nullable<Timestamptz>,
        delivered_at -> Nullable<Timestamptz>,
        cancelled_at -> Nullable<Timestamptz>,
        cancellation_reason -> Nullable<Text>,
        /// Soft-archive marker.
        archived_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Line items captured at placement.
    order_items (id) {
        id -> Int8,
        order_id -> Int8,
        name -> Text,
        unit_price_cents -> Int8,
        quantity -> Int4,
    }
}

diesel::table! {
    /// Append-only transition log.
    order_status_history (id) {
        id -> Int8,
        order_id -> Int8,
        from_status -> Nullable<Text>,
        to_status -> Text,
        /// Null for the system actor.
        actor_user_id -> Nullable<Int8>,
        note -> Nullable<Text>,
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    /// One row per driver, created on the first heartbeat.
    driver_availability (driver_id) {
        driver_id -> Int8,
        is_available -> Bool,
        last_heartbeat_at -> Timestamptz,
        current_order_id -> Nullable<Int8>,
    }
}

diesel::joinable!(order_items -> orders (order_id));
diesel::joinable!(order_status_history -> orders (order_id));
diesel::joinable!(driver_availability -> orders (current_order_id));

diesel::allow_tables_to_appear_in_same_query!(
    driver_availability,
    order_items,
    order_status_history,
    orders,
);
