//! Team directory: public list of active staff, admin CRUD.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use pawmart_core::fields::{normalize_email, optional_text, require_text};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::{AppState, TeamMemberRecord};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamMemberInput {
    pub name: String,
    pub position: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

struct CleanMember {
    name: String,
    position: String,
    bio: Option<String>,
    photo_url: Option<String>,
    email: Option<String>,
}

fn clean(input: &TeamMemberInput) -> Result<CleanMember, AppError> {
    let email = match optional_text("email", input.email.as_deref(), 254)? {
        Some(e) => Some(normalize_email(&e)?),
        None => None,
    };
    Ok(CleanMember {
        name: require_text("name", &input.name, 120)?,
        position: require_text("position", &input.position, 120)?,
        bio: optional_text("bio", input.bio.as_deref(), 2000)?,
        photo_url: optional_text("photo_url", input.photo_url.as_deref(), 2048)?,
        email,
    })
}

/// Active members ordered by `display_order`, then name.
pub fn ordered_active(mut members: Vec<TeamMemberRecord>) -> Vec<TeamMemberRecord> {
    members.retain(|m| m.active);
    members.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.name.cmp(&b.name))
    });
    members
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/team", get(list_team))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/team", post(create_member))
        .route("/v1/admin/team/:id", put(update_member).delete(delete_member))
}

/// GET /v1/team
#[utoipa::path(
    get,
    path = "/v1/team",
    responses((status = 200, description = "Active team members", body = Vec<TeamMemberRecord>)),
    tag = "team"
)]
async fn list_team(State(state): State<AppState>) -> Json<Vec<TeamMemberRecord>> {
    Json(ordered_active(state.team.list()))
}

/// POST /v1/admin/team
#[utoipa::path(
    post,
    path = "/v1/admin/team",
    request_body = TeamMemberInput,
    responses(
        (status = 201, description = "Created", body = TeamMemberRecord),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn create_member(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<TeamMemberInput>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamMemberRecord>), AppError> {
    require_role(&caller, Role::Admin)?;
    let input = extract_json(body)?;
    let c = clean(&input)?;
    let now = Utc::now();
    let member = TeamMemberRecord {
        id: Uuid::new_v4(),
        name: c.name,
        position: c.position,
        bio: c.bio,
        photo_url: c.photo_url,
        email: c.email,
        display_order: input.display_order,
        active: input.active,
        created_at: now,
        updated_at: now,
    };
    state.team.insert(member.id, member.clone());
    state.persist(&member).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// PUT /v1/admin/team/:id
#[utoipa::path(
    put,
    path = "/v1/admin/team/{id}",
    params(("id" = Uuid, Path, description = "Team member ID")),
    request_body = TeamMemberInput,
    responses(
        (status = 200, description = "Updated", body = TeamMemberRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn update_member(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<TeamMemberInput>, JsonRejection>,
) -> Result<Json<TeamMemberRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let input = extract_json(body)?;
    let c = clean(&input)?;
    let member = state
        .team
        .update(&id, |m| {
            m.name = c.name;
            m.position = c.position;
            m.bio = c.bio;
            m.photo_url = c.photo_url;
            m.email = c.email;
            m.display_order = input.display_order;
            m.active = input.active;
            m.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("team member {id} not found")))?;
    state.persist(&member).await?;
    Ok(Json(member))
}

/// DELETE /v1/admin/team/:id
#[utoipa::path(
    delete,
    path = "/v1/admin/team/{id}",
    params(("id" = Uuid, Path, description = "Team member ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "admin"
)]
async fn delete_member(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&caller, Role::Admin)?;
    state
        .team
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("team member {id} not found")))?;
    state.persist_delete::<TeamMemberRecord>(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
