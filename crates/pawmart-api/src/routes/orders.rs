//! # Orders
//!
//! Customers see and cancel their own orders; other customers' orders
//! answer 404. Staff list every order and drive the status lifecycle:
//!
//! ```text
//! PENDING ──► PROCESSING ──► SHIPPED ──► DELIVERED
//!    │            │
//!    └────────────┴──► CANCELLED (stock returned)
//! ```

use std::cmp::Reverse;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use pawmart_core::OrderStatus;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::notify;
use crate::routes::checkout;
use crate::state::{AppState, OrderRecord, StatusChange};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderQuery {
    #[param(value_type = Option<String>)]
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderStatusUpdate {
    #[schema(value_type = String, example = "PROCESSING")]
    pub status: OrderStatus,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(list_own))
        .route("/v1/orders/:id", get(get_own))
        .route("/v1/orders/:id/cancel", post(cancel_own))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/orders", get(list_all))
        .route("/v1/admin/orders/:id", get(get_any))
        .route("/v1/admin/orders/:id/status", put(update_status))
}

fn newest_first(mut orders: Vec<OrderRecord>) -> Vec<OrderRecord> {
    orders.sort_by_key(|o| (Reverse(o.created_at), o.id));
    orders
}

fn own_order(state: &AppState, user_id: Uuid, id: Uuid) -> Result<OrderRecord, AppError> {
    state
        .orders
        .get(&id)
        .filter(|o| o.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
}

/// Move an order to `to`, append history, persist, and return stock on
/// cancellation. The transition is checked under the store lock.
pub async fn transition_order(
    state: &AppState,
    id: Uuid,
    to: OrderStatus,
) -> Result<OrderRecord, AppError> {
    transition_order_from(state, id, to, |_| true).await
}

/// As [`transition_order`], but only from a status `allowed_from` accepts.
/// Both checks run under the same lock as the write.
///
/// Once the status change is committed in memory, stock for a cancellation
/// is returned even if the database write fails.
pub async fn transition_order_from(
    state: &AppState,
    id: Uuid,
    to: OrderStatus,
    allowed_from: impl FnOnce(OrderStatus) -> bool,
) -> Result<OrderRecord, AppError> {
    let order = state
        .orders
        .try_update(&id, |o| {
            if !allowed_from(o.status) {
                return Err(AppError::Conflict(format!(
                    "order {} is {} and cannot move to {to}",
                    o.order_number, o.status
                )));
            }
            o.status = o.status.transition(to)?;
            let now = Utc::now();
            o.status_history.push(StatusChange { status: to, at: now });
            o.updated_at = now;
            Ok::<_, AppError>(o.clone())
        })
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))??;

    let persisted = state.persist(&order).await;
    if to == OrderStatus::Cancelled {
        checkout::restock(state, &order).await;
    }
    persisted?;
    tracing::info!(order_id = %id, status = %to, "order status changed");
    Ok(order)
}

/// GET /v1/orders — The caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/v1/orders",
    responses((status = 200, description = "Own orders", body = Vec<OrderRecord>)),
    tag = "orders"
)]
async fn list_own(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<OrderRecord>>, AppError> {
    let user_id = caller.require_user()?;
    Ok(Json(newest_first(
        state.orders.filter(|o| o.user_id == user_id),
    )))
}

/// GET /v1/orders/:id
#[utoipa::path(
    get,
    path = "/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = OrderRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
async fn get_own(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderRecord>, AppError> {
    let user_id = caller.require_user()?;
    own_order(&state, user_id, id).map(Json)
}

/// POST /v1/orders/:id/cancel — Cancel an order that is still PENDING.
#[utoipa::path(
    post,
    path = "/v1/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Cancelled", body = OrderRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "No longer cancellable", body = crate::error::ErrorBody),
    ),
    tag = "orders"
)]
async fn cancel_own(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderRecord>, AppError> {
    let user_id = caller.require_user()?;
    own_order(&state, user_id, id)?;
    let order = transition_order_from(&state, id, OrderStatus::Cancelled, |from| {
        from == OrderStatus::Pending
    })
    .await?;
    notify::send_in_background(&state, "order_status", notify::order_status(&order));
    Ok(Json(order))
}

/// GET /v1/admin/orders — All orders, optionally by status.
#[utoipa::path(
    get,
    path = "/v1/admin/orders",
    params(OrderQuery),
    responses((status = 200, description = "Orders", body = Vec<OrderRecord>)),
    tag = "admin"
)]
async fn list_all(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<OrderQuery>, QueryRejection>,
) -> Result<Json<Vec<OrderRecord>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let query = extract_query(query)?;
    Ok(Json(newest_first(state.orders.filter(|o| {
        query.status.map_or(true, |s| o.status == s)
    }))))
}

/// GET /v1/admin/orders/:id
#[utoipa::path(
    get,
    path = "/v1/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = OrderRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn get_any(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    state
        .orders
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
}

/// PUT /v1/admin/orders/:id/status — Advance or cancel an order.
#[utoipa::path(
    put,
    path = "/v1/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = OrderStatusUpdate,
    responses(
        (status = 200, description = "Updated", body = OrderRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Illegal transition", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn update_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<OrderStatusUpdate>, JsonRejection>,
) -> Result<Json<OrderRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let update = extract_json(body)?;
    let order = transition_order(&state, id, update.status).await?;
    notify::send_in_background(&state, "order_status", notify::order_status(&order));
    Ok(Json(order))
}
