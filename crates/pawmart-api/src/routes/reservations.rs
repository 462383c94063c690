//! # Pet Visit Reservations
//!
//! Customers book one-hour visits to meet an AVAILABLE pet. A slot holds
//! at most one active (PENDING or CONFIRMED) reservation per pet.
//!
//! Staff drive the lifecycle. Confirming a visit marks the pet RESERVED;
//! cancelling the last confirmed visit releases it back to AVAILABLE.
//! Cancelling a visit that was never confirmed leaves the pet alone.
//! Completing a visit leaves the pet's status to staff, who decide
//! whether the adoption went ahead.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use pawmart_core::fields::{normalize_email, optional_text, require_text};
use pawmart_core::reservation::{validate_party_size, validate_visit};
use pawmart_core::{AdoptionStatus, ReservationStatus};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::notify;
use crate::routes::pets::has_confirmed_visit;
use crate::state::{AppState, ReservationRecord};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReservationRequest {
    pub pet_id: Uuid,
    /// Any time within the wanted hour; stored as the start of the hour.
    pub scheduled_for: DateTime<Utc>,
    #[serde(default = "one")]
    pub party_size: u32,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReservationQuery {
    #[param(value_type = Option<String>)]
    pub status: Option<ReservationStatus>,
    pub pet_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReservationStatusUpdate {
    #[schema(value_type = String, example = "CONFIRMED")]
    pub status: ReservationStatus,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", get(list_own).post(book))
        .route("/v1/reservations/:id/cancel", post(cancel_own))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/reservations", get(list_all))
        .route("/v1/admin/reservations/:id/status", put(update_status))
}

fn soonest_first(mut items: Vec<ReservationRecord>) -> Vec<ReservationRecord> {
    items.sort_by_key(|r| (r.scheduled_for, r.id));
    items
}

fn pet_name(state: &AppState, pet_id: Uuid) -> String {
    state
        .pets
        .get(&pet_id)
        .map(|p| p.name)
        .unwrap_or_else(|| "your visit".to_string())
}

/// Move a reservation to `to` and update the pet to match.
///
/// Confirming marks an AVAILABLE pet RESERVED. Cancelling a visit that was
/// CONFIRMED releases a RESERVED pet unless another confirmed visit holds
/// it. The pet follows even if persisting the reservation fails.
pub async fn transition_reservation(
    state: &AppState,
    id: Uuid,
    to: ReservationStatus,
) -> Result<ReservationRecord, AppError> {
    let (from, reservation) = state
        .reservations
        .try_update(&id, |r| {
            let from = r.status;
            r.status = r.status.transition(to)?;
            r.updated_at = Utc::now();
            Ok::<_, pawmart_core::TransitionError>((from, r.clone()))
        })
        .ok_or_else(|| AppError::NotFound(format!("reservation {id} not found")))??;
    let persisted = state.persist(&reservation).await;

    let pet_id = reservation.pet_id;
    let next_pet_status = match (from, to) {
        (_, ReservationStatus::Confirmed) => {
            Some((AdoptionStatus::Available, AdoptionStatus::Reserved))
        }
        (ReservationStatus::Confirmed, ReservationStatus::Cancelled)
            if !has_confirmed_visit(state, pet_id, id) =>
        {
            Some((AdoptionStatus::Reserved, AdoptionStatus::Available))
        }
        _ => None,
    };
    let mut pet_persisted = Ok(());
    if let Some((pet_from, pet_to)) = next_pet_status {
        let changed = state.pets.try_update(&pet_id, |p| {
            if p.status == pet_from {
                p.status = pet_to;
                p.updated_at = Utc::now();
                Ok(p.clone())
            } else {
                Err(())
            }
        });
        if let Some(Ok(pet)) = changed {
            pet_persisted = state.persist(&pet).await;
            tracing::info!(pet_id = %pet_id, status = %pet.status, "pet status follows reservation");
        }
    }

    persisted?;
    pet_persisted?;
    tracing::info!(reservation_id = %id, status = %to, "reservation status changed");
    Ok(reservation)
}

/// POST /v1/reservations — Book a visit.
#[utoipa::path(
    post,
    path = "/v1/reservations",
    request_body = ReservationRequest,
    responses(
        (status = 201, description = "Booked", body = ReservationRecord),
        (status = 404, description = "Unknown pet", body = crate::error::ErrorBody),
        (status = 409, description = "Pet unavailable or slot taken", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid time, party size or contact", body = crate::error::ErrorBody),
    ),
    tag = "reservations"
)]
async fn book(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationRecord>), AppError> {
    let user_id = caller.require_user()?;
    let req = extract_json(body)?;

    let now = Utc::now();
    let slot = validate_visit(req.scheduled_for, now)?;
    validate_party_size(req.party_size)?;
    let contact_name = require_text("contact_name", &req.contact_name, 120)?;
    let contact_email = normalize_email(&req.contact_email)?;
    let contact_phone = optional_text("contact_phone", req.contact_phone.as_deref(), 30)?;
    let notes = optional_text("notes", req.notes.as_deref(), 1000)?;

    let pet = state
        .pets
        .get(&req.pet_id)
        .ok_or_else(|| AppError::NotFound(format!("pet {} not found", req.pet_id)))?;
    if pet.status != AdoptionStatus::Available {
        return Err(AppError::Conflict(format!(
            "{} is {} and not taking visits",
            pet.name, pet.status
        )));
    }

    let reservation = ReservationRecord {
        id: Uuid::new_v4(),
        user_id,
        pet_id: pet.id,
        contact_name,
        contact_email,
        contact_phone,
        scheduled_for: slot,
        party_size: req.party_size,
        notes,
        status: ReservationStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    let inserted = state.reservations.insert_unless(reservation.id, reservation.clone(), |r| {
        r.pet_id == pet.id && r.scheduled_for == slot && r.status.is_active()
    });
    if !inserted {
        return Err(AppError::Conflict(format!(
            "{} already has a visit booked at {}",
            pet.name,
            slot.format("%Y-%m-%d %H:%M UTC")
        )));
    }
    state.persist(&reservation).await?;

    tracing::info!(
        reservation_id = %reservation.id,
        pet_id = %pet.id,
        scheduled_for = %slot,
        "visit booked"
    );
    notify::send_in_background(&state, "reservation", notify::reservation(&reservation, &pet.name));
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// GET /v1/reservations — The caller's reservations, soonest first.
#[utoipa::path(
    get,
    path = "/v1/reservations",
    responses((status = 200, description = "Own reservations", body = Vec<ReservationRecord>)),
    tag = "reservations"
)]
async fn list_own(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<ReservationRecord>>, AppError> {
    let user_id = caller.require_user()?;
    Ok(Json(soonest_first(
        state.reservations.filter(|r| r.user_id == user_id),
    )))
}

/// POST /v1/reservations/:id/cancel
#[utoipa::path(
    post,
    path = "/v1/reservations/{id}/cancel",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Cancelled", body = ReservationRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already completed or cancelled", body = crate::error::ErrorBody),
    ),
    tag = "reservations"
)]
async fn cancel_own(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationRecord>, AppError> {
    let user_id = caller.require_user()?;
    if !state.reservations.get(&id).is_some_and(|r| r.user_id == user_id) {
        return Err(AppError::NotFound(format!("reservation {id} not found")));
    }
    let reservation = transition_reservation(&state, id, ReservationStatus::Cancelled).await?;
    notify::send_in_background(
        &state,
        "reservation",
        notify::reservation(&reservation, &pet_name(&state, reservation.pet_id)),
    );
    Ok(Json(reservation))
}

/// GET /v1/admin/reservations — All reservations, optionally filtered.
#[utoipa::path(
    get,
    path = "/v1/admin/reservations",
    params(ReservationQuery),
    responses((status = 200, description = "Reservations", body = Vec<ReservationRecord>)),
    tag = "admin"
)]
async fn list_all(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<ReservationQuery>, QueryRejection>,
) -> Result<Json<Vec<ReservationRecord>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let query = extract_query(query)?;
    Ok(Json(soonest_first(state.reservations.filter(|r| {
        query.status.map_or(true, |s| r.status == s)
            && query.pet_id.map_or(true, |p| r.pet_id == p)
    }))))
}

/// PUT /v1/admin/reservations/:id/status
#[utoipa::path(
    put,
    path = "/v1/admin/reservations/{id}/status",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body = ReservationStatusUpdate,
    responses(
        (status = 200, description = "Updated", body = ReservationRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Illegal transition", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn update_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<ReservationStatusUpdate>, JsonRejection>,
) -> Result<Json<ReservationRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let update = extract_json(body)?;
    let reservation = transition_reservation(&state, id, update.status).await?;
    notify::send_in_background(
        &state,
        "reservation",
        notify::reservation(&reservation, &pet_name(&state, reservation.pet_id)),
    );
    Ok(Json(reservation))
}
