//! # Back Office
//!
//! Dashboard and account administration. Catalog, pet, gallery, team,
//! order and reservation administration live with their resources.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use pawmart_core::{AdoptionStatus, Money, OrderStatus, ReservationStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::{AccountView, AppState, ReservationRecord};

/// A product running low.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LowStockItem {
    pub product_id: Uuid,
    pub name: String,
    pub stock: u32,
}

/// Request counters since start-up.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequestMetrics {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub orders_placed: u64,
}

/// Store overview for staff.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Dashboard {
    pub products: usize,
    pub active_products: usize,
    pub pets: usize,
    /// Pet count per adoption status.
    pub pets_by_status: BTreeMap<String, usize>,
    pub customers: usize,
    pub orders: usize,
    /// Order count per status.
    pub orders_by_status: BTreeMap<String, usize>,
    /// Sum of totals of orders that were not cancelled.
    #[schema(value_type = String)]
    pub revenue: Money,
    /// Active products below the low-stock threshold, lowest first.
    pub low_stock: Vec<LowStockItem>,
    pub pending_reservations: usize,
    /// Active reservations from now on, soonest first (at most 10).
    pub upcoming_reservations: Vec<ReservationRecord>,
    pub metrics: RequestMetrics,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleUpdate {
    pub role: Role,
}

const UPCOMING_LIMIT: usize = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/dashboard", get(dashboard))
        .route("/v1/admin/users", get(list_users))
        .route("/v1/admin/users/:id/role", put(set_role))
}

/// Compute the dashboard from current state.
pub fn build_dashboard(state: &AppState) -> Result<Dashboard, AppError> {
    let products = state.products.list();
    let pets = state.pets.list();
    let orders = state.orders.list();
    let reservations = state.reservations.list();
    let threshold = state.config.low_stock_threshold;

    let mut pets_by_status: BTreeMap<String, usize> = [
        AdoptionStatus::Available,
        AdoptionStatus::Reserved,
        AdoptionStatus::Adopted,
    ]
    .iter()
    .map(|s| (s.as_str().to_string(), 0))
    .collect();
    for pet in &pets {
        *pets_by_status.entry(pet.status.as_str().to_string()).or_default() += 1;
    }

    let mut orders_by_status: BTreeMap<String, usize> = BTreeMap::new();
    for order in &orders {
        *orders_by_status.entry(order.status.as_str().to_string()).or_default() += 1;
    }

    let revenue = Money::checked_sum(
        orders
            .iter()
            .filter(|o| o.status != OrderStatus::Cancelled)
            .map(|o| o.total),
    )?;

    let mut low_stock: Vec<LowStockItem> = products
        .iter()
        .filter(|p| p.active && p.stock < threshold)
        .map(|p| LowStockItem {
            product_id: p.id,
            name: p.name.clone(),
            stock: p.stock,
        })
        .collect();
    low_stock.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));

    let now = Utc::now();
    let mut upcoming: Vec<ReservationRecord> = reservations
        .iter()
        .filter(|r| r.status.is_active() && r.scheduled_for >= now)
        .cloned()
        .collect();
    upcoming.sort_by_key(|r| (r.scheduled_for, r.id));
    upcoming.truncate(UPCOMING_LIMIT);

    Ok(Dashboard {
        products: products.len(),
        active_products: products.iter().filter(|p| p.active).count(),
        pets: pets.len(),
        pets_by_status,
        customers: state.users.filter(|u| u.role == Role::Customer).len(),
        orders: orders.len(),
        orders_by_status,
        revenue,
        low_stock,
        pending_reservations: reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Pending)
            .count(),
        upcoming_reservations: upcoming,
        metrics: RequestMetrics {
            requests: state.metrics.requests(),
            client_errors: state.metrics.client_errors(),
            server_errors: state.metrics.server_errors(),
            orders_placed: state.metrics.orders(),
        },
    })
}

/// GET /v1/admin/dashboard
#[utoipa::path(
    get,
    path = "/v1/admin/dashboard",
    responses(
        (status = 200, description = "Store overview", body = Dashboard),
        (status = 403, description = "Not an admin", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn dashboard(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Dashboard>, AppError> {
    require_role(&caller, Role::Admin)?;
    build_dashboard(&state).map(Json)
}

/// GET /v1/admin/users — Every account, oldest first.
#[utoipa::path(
    get,
    path = "/v1/admin/users",
    responses((status = 200, description = "Accounts", body = Vec<AccountView>)),
    tag = "admin"
)]
async fn list_users(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<AccountView>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let mut users = state.users.list();
    users.sort_by_key(|u| (u.created_at, u.id));
    Ok(Json(users.iter().map(AccountView::from).collect()))
}

/// PUT /v1/admin/users/:id/role — Promote or demote an account.
///
/// Takes effect on the account's next request. Admins cannot demote
/// themselves.
#[utoipa::path(
    put,
    path = "/v1/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = RoleUpdate,
    responses(
        (status = 200, description = "Updated", body = AccountView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Self-demotion", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn set_role(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<RoleUpdate>, JsonRejection>,
) -> Result<Json<AccountView>, AppError> {
    require_role(&caller, Role::Admin)?;
    let update = extract_json(body)?;
    if caller.user_id == Some(id) && update.role != Role::Admin {
        return Err(AppError::Conflict("admins cannot demote themselves".into()));
    }
    let user = state
        .users
        .update(&id, |u| {
            u.role = update.role;
            u.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("account {id} not found")))?;
    state.persist(&user).await?;
    tracing::info!(user_id = %id, role = update.role.as_str(), "role changed");
    Ok(Json(AccountView::from(&user)))
}
