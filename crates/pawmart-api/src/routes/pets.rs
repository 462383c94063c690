//! # Adoptable Pets
//!
//! Public listing and detail; admin CRUD under `/v1/admin/pets`.

use std::cmp::Reverse;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use pawmart_core::fields::{optional_text, require_text};
use pawmart_core::{AdoptionStatus, Money, PetSex, PetSize, ReservationStatus, Species};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, Page, PageParams, Validate};
use crate::state::{AppState, PetRecord};

/// Oldest age accepted for a listing, in months.
const MAX_AGE_MONTHS: u32 = 360;

/// Filters for `GET /v1/pets`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PetQuery {
    #[param(value_type = Option<String>)]
    pub species: Option<Species>,
    #[param(value_type = Option<String>)]
    pub status: Option<AdoptionStatus>,
    #[param(value_type = Option<String>)]
    pub size: Option<PetSize>,
    #[param(value_type = Option<String>)]
    pub sex: Option<PetSex>,
    /// Case-insensitive match on name, breed and description.
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Apply filters to the pet list, newest listing first.
pub fn filter_pets(pets: Vec<PetRecord>, query: &PetQuery) -> Vec<PetRecord> {
    let needle = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut items: Vec<PetRecord> = pets
        .into_iter()
        .filter(|p| query.species.map_or(true, |s| s == p.species))
        .filter(|p| query.status.map_or(true, |s| s == p.status))
        .filter(|p| query.size.map_or(true, |s| s == p.size))
        .filter(|p| query.sex.map_or(true, |s| s == p.sex))
        .filter(|p| match &needle {
            Some(n) => {
                p.name.to_lowercase().contains(n)
                    || p.breed.as_deref().is_some_and(|b| b.to_lowercase().contains(n))
                    || p.description.to_lowercase().contains(n)
            }
            None => true,
        })
        .collect();
    items.sort_by_key(|p| (Reverse(p.created_at), p.id));
    items
}

/// Create or replace a pet listing (admin).
#[derive(Debug, Deserialize, ToSchema)]
pub struct PetInput {
    pub name: String,
    #[schema(value_type = String, example = "dog")]
    pub species: Species,
    pub breed: Option<String>,
    pub age_months: u32,
    #[schema(value_type = String, example = "medium")]
    pub size: PetSize,
    #[schema(value_type = String, example = "female")]
    pub sex: PetSex,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[schema(value_type = String, example = "150.00")]
    pub adoption_fee: Money,
    #[schema(value_type = Option<String>)]
    pub status: Option<AdoptionStatus>,
    #[serde(default)]
    pub vaccinated: bool,
    #[serde(default)]
    pub neutered: bool,
}

impl Validate for PetInput {
    fn validate(&self) -> Result<(), String> {
        if self.age_months > MAX_AGE_MONTHS {
            return Err(format!("age_months must not exceed {MAX_AGE_MONTHS}"));
        }
        Ok(())
    }
}

/// Public pet routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/pets", get(list_pets))
        .route("/v1/pets/:id", get(get_pet))
}

/// Admin pet routes.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/pets", post(create_pet))
        .route("/v1/admin/pets/:id", put(update_pet).delete(delete_pet))
}

/// GET /v1/pets — Filtered, paginated adoption listings.
#[utoipa::path(
    get,
    path = "/v1/pets",
    params(PetQuery),
    responses(
        (status = 200, description = "One page of pets", body = crate::extractors::PetPage),
        (status = 400, description = "Malformed filter", body = crate::error::ErrorBody),
    ),
    tag = "pets"
)]
async fn list_pets(
    State(state): State<AppState>,
    query: Result<Query<PetQuery>, QueryRejection>,
) -> Result<Json<Page<PetRecord>>, AppError> {
    let query = extract_query(query)?;
    let items = filter_pets(state.pets.list(), &query);
    Ok(Json(Page::from_sorted(
        items,
        PageParams {
            page: query.page,
            per_page: query.per_page,
        },
    )))
}

/// GET /v1/pets/:id — Pet detail.
#[utoipa::path(
    get,
    path = "/v1/pets/{id}",
    params(("id" = Uuid, Path, description = "Pet ID")),
    responses(
        (status = 200, description = "Pet", body = PetRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "pets"
)]
async fn get_pet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PetRecord>, AppError> {
    state
        .pets
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("pet {id} not found")))
}

/// POST /v1/admin/pets — List a pet for adoption.
#[utoipa::path(
    post,
    path = "/v1/admin/pets",
    request_body = PetInput,
    responses(
        (status = 201, description = "Created", body = PetRecord),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn create_pet(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<PetInput>, JsonRejection>,
) -> Result<(StatusCode, Json<PetRecord>), AppError> {
    require_role(&caller, Role::Admin)?;
    let input = extract_validated_json(body)?;
    let now = Utc::now();
    let pet = PetRecord {
        id: Uuid::new_v4(),
        name: require_text("name", &input.name, 80)?,
        species: input.species,
        breed: optional_text("breed", input.breed.as_deref(), 80)?,
        age_months: input.age_months,
        size: input.size,
        sex: input.sex,
        description: input.description.trim().to_string(),
        images: input.images,
        adoption_fee: input.adoption_fee,
        status: input.status.unwrap_or(AdoptionStatus::Available),
        vaccinated: input.vaccinated,
        neutered: input.neutered,
        created_at: now,
        updated_at: now,
    };
    state.pets.insert(pet.id, pet.clone());
    state.persist(&pet).await?;
    tracing::info!(pet_id = %pet.id, "pet listed");
    Ok((StatusCode::CREATED, Json(pet)))
}

/// PUT /v1/admin/pets/:id — Replace a pet listing.
#[utoipa::path(
    put,
    path = "/v1/admin/pets/{id}",
    params(("id" = Uuid, Path, description = "Pet ID")),
    request_body = PetInput,
    responses(
        (status = 200, description = "Updated", body = PetRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn update_pet(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<PetInput>, JsonRejection>,
) -> Result<Json<PetRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let input = extract_validated_json(body)?;
    let name = require_text("name", &input.name, 80)?;
    let breed = optional_text("breed", input.breed.as_deref(), 80)?;

    let pet = state
        .pets
        .update(&id, |p| {
            p.name = name;
            p.species = input.species;
            p.breed = breed;
            p.age_months = input.age_months;
            p.size = input.size;
            p.sex = input.sex;
            p.description = input.description.trim().to_string();
            p.images = input.images;
            p.adoption_fee = input.adoption_fee;
            if let Some(status) = input.status {
                p.status = status;
            }
            p.vaccinated = input.vaccinated;
            p.neutered = input.neutered;
            p.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("pet {id} not found")))?;
    state.persist(&pet).await?;
    Ok(Json(pet))
}

/// DELETE /v1/admin/pets/:id — Remove a listing.
///
/// Refused while the pet has a pending or confirmed visit.
#[utoipa::path(
    delete,
    path = "/v1/admin/pets/{id}",
    params(("id" = Uuid, Path, description = "Pet ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Active reservations exist", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn delete_pet(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    if !state.pets.contains(&id) {
        return Err(AppError::NotFound(format!("pet {id} not found")));
    }
    let active = state
        .reservations
        .filter(|r| r.pet_id == id && r.status.is_active())
        .len();
    if active > 0 {
        return Err(AppError::Conflict(format!(
            "pet {id} has {active} active reservation(s)"
        )));
    }
    state.pets.remove(&id);
    state.persist_delete::<PetRecord>(id).await?;
    tracing::info!(pet_id = %id, "pet removed");
    Ok(StatusCode::NO_CONTENT)
}

/// Whether any other confirmed, still-active visit holds this pet.
pub fn has_confirmed_visit(state: &AppState, pet_id: Uuid, except: Uuid) -> bool {
    state
        .reservations
        .find(|r| r.pet_id == pet_id && r.id != except && r.status == ReservationStatus::Confirmed)
        .is_some()
}
