//! Public photo gallery and its admin CRUD.

use std::cmp::Reverse;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use pawmart_core::fields::{optional_text, require_text};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::state::{AppState, GalleryItemRecord};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GalleryQuery {
    /// Only items carrying this tag (case-insensitive).
    pub tag: Option<String>,
    /// Only photos of this pet.
    pub pet_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GalleryInput {
    pub title: String,
    pub image_url: String,
    pub caption: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub pet_id: Option<Uuid>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/gallery", get(list_gallery))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/gallery", post(create_item))
        .route("/v1/admin/gallery/:id", put(update_item).delete(delete_item))
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn check_pet(state: &AppState, pet_id: Option<Uuid>) -> Result<(), AppError> {
    match pet_id {
        Some(id) if !state.pets.contains(&id) => {
            Err(AppError::Validation(format!("pet {id} does not exist")))
        }
        _ => Ok(()),
    }
}

/// GET /v1/gallery — Gallery items, newest first.
#[utoipa::path(
    get,
    path = "/v1/gallery",
    params(GalleryQuery),
    responses((status = 200, description = "Gallery items", body = Vec<GalleryItemRecord>)),
    tag = "gallery"
)]
async fn list_gallery(
    State(state): State<AppState>,
    query: Result<Query<GalleryQuery>, QueryRejection>,
) -> Result<Json<Vec<GalleryItemRecord>>, AppError> {
    let query = extract_query(query)?;
    let tag = query.tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty());
    let mut items = state.gallery.filter(|item| {
        tag.as_ref().map_or(true, |t| item.tags.contains(t))
            && query.pet_id.map_or(true, |id| item.pet_id == Some(id))
    });
    items.sort_by_key(|i| (Reverse(i.created_at), i.id));
    Ok(Json(items))
}

/// POST /v1/admin/gallery — Add a photo.
#[utoipa::path(
    post,
    path = "/v1/admin/gallery",
    request_body = GalleryInput,
    responses(
        (status = 201, description = "Created", body = GalleryItemRecord),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn create_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<GalleryInput>, JsonRejection>,
) -> Result<(StatusCode, Json<GalleryItemRecord>), AppError> {
    require_role(&caller, Role::Admin)?;
    let input = extract_json(body)?;
    check_pet(&state, input.pet_id)?;
    let item = GalleryItemRecord {
        id: Uuid::new_v4(),
        title: require_text("title", &input.title, 120)?,
        image_url: require_text("image_url", &input.image_url, 2048)?,
        caption: optional_text("caption", input.caption.as_deref(), 500)?,
        tags: normalize_tags(input.tags),
        pet_id: input.pet_id,
        created_at: Utc::now(),
    };
    state.gallery.insert(item.id, item.clone());
    state.persist(&item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /v1/admin/gallery/:id — Replace a photo's details.
#[utoipa::path(
    put,
    path = "/v1/admin/gallery/{id}",
    params(("id" = Uuid, Path, description = "Gallery item ID")),
    request_body = GalleryInput,
    responses(
        (status = 200, description = "Updated", body = GalleryItemRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn update_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<GalleryInput>, JsonRejection>,
) -> Result<Json<GalleryItemRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let input = extract_json(body)?;
    check_pet(&state, input.pet_id)?;
    let title = require_text("title", &input.title, 120)?;
    let image_url = require_text("image_url", &input.image_url, 2048)?;
    let caption = optional_text("caption", input.caption.as_deref(), 500)?;
    let tags = normalize_tags(input.tags);

    let item = state
        .gallery
        .update(&id, |i| {
            i.title = title;
            i.image_url = image_url;
            i.caption = caption;
            i.tags = tags;
            i.pet_id = input.pet_id;
        })
        .ok_or_else(|| AppError::NotFound(format!("gallery item {id} not found")))?;
    state.persist(&item).await?;
    Ok(Json(item))
}

/// DELETE /v1/admin/gallery/:id
#[utoipa::path(
    delete,
    path = "/v1/admin/gallery/{id}",
    params(("id" = Uuid, Path, description = "Gallery item ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn delete_item(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    state
        .gallery
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("gallery item {id} not found")))?;
    state.persist_delete::<GalleryItemRecord>(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
