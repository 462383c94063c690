//! # Accounts — Registration, Login, Sessions
//!
//! Registration and login are public and return a session token. Logout
//! and `me` require a session.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use pawmart_core::fields::{normalize_email, optional_text, require_text};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::auth::{self, CallerIdentity, IssuedSession, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::notify;
use crate::state::{AccountView, AppState, UserRecord};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

/// Registration request.
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        let len = self.password.chars().count();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
            return Err(format!(
                "password must be {MIN_PASSWORD_LEN} to {MAX_PASSWORD_LEN} characters"
            ));
        }
        Ok(())
    }
}

/// Login request.
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("email and password are required".to_string());
        }
        Ok(())
    }
}

/// Session plus the account it belongs to.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub session: IssuedSession,
    pub account: AccountView,
}

/// Public account routes.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
}

/// Session-scoped account routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/logout", post(logout))
        .route("/v1/auth/me", get(me))
}

/// POST /v1/auth/register — Create a customer account and sign in.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let email = normalize_email(&req.email)?;
    let name = require_text("name", &req.name, 120)?;
    let phone = optional_text("phone", req.phone.as_deref(), 30)?;

    if state.users.find(|u| u.email == email).is_some() {
        return Err(AppError::Conflict(format!("{email} is already registered")));
    }

    let password_hash = auth::hash_password_blocking(Zeroizing::new(req.password)).await?;
    let now = Utc::now();
    let user = UserRecord {
        id: Uuid::new_v4(),
        email,
        name,
        phone,
        role: Role::Customer,
        password_hash,
        created_at: now,
        updated_at: now,
    };

    if !state
        .users
        .insert_unless(user.id, user.clone(), |u| u.email == user.email)
    {
        return Err(AppError::Conflict(format!("{} is already registered", user.email)));
    }
    state.persist(&user).await?;

    let session = auth::issue_session(&state, user.id).await?;
    tracing::info!(user_id = %user.id, "account registered");
    notify::send_in_background(
        &state,
        "welcome",
        pawmart_mail::templates::welcome(&user.email, &user.name),
    );

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session,
            account: AccountView::from(&user),
        }),
    ))
}

/// POST /v1/auth/login — Exchange email and password for a session.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let email = req.email.trim().to_lowercase();
    let password = Zeroizing::new(req.password);

    let Some(user) = state.users.find(|u| u.email == email) else {
        return Err(AppError::Unauthorized("invalid email or password".into()));
    };

    if !auth::verify_password_blocking(password, user.password_hash.clone()).await? {
        tracing::warn!(user_id = %user.id, "failed login");
        return Err(AppError::Unauthorized("invalid email or password".into()));
    }

    let session = auth::issue_session(&state, user.id).await?;
    Ok(Json(SessionResponse {
        session,
        account: AccountView::from(&user),
    }))
}

/// POST /v1/auth/logout — Revoke the current session.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
async fn logout(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<StatusCode, AppError> {
    if let Some(session_id) = caller.session_id {
        auth::revoke_session(&state, session_id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/auth/me — The signed-in account.
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    responses(
        (status = 200, description = "Current account", body = AccountView),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
async fn me(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<AccountView>, AppError> {
    let user_id = caller.require_user()?;
    state
        .users
        .get(&user_id)
        .map(|u| Json(AccountView::from(&u)))
        .ok_or_else(|| AppError::NotFound(format!("account {user_id} not found")))
}
