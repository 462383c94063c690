//! # Authentication & Authorization
//!
//! Session-based bearer authentication with role-based access control.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {session_id}.{secret}   — login session (customer or admin)
//! Bearer {ADMIN_TOKEN}           — static operator token, admin identity
//! ```
//!
//! The session secret is 32 random bytes, hex-encoded. Only its SHA-256 is
//! stored; the comparison is constant-time. Sessions expire after
//! `SESSION_TTL_HOURS`.
//!
//! ## Passwords
//!
//! Salted, iterated SHA-256:
//!
//! ```text
//! h0 = SHA-256(salt ‖ password)
//! hi = SHA-256(h(i-1) ‖ password)      for i in 1..rounds
//! stored = "sha256i$<rounds>$<salt hex>$<h(rounds-1) hex>"
//! ```
//!
//! ## CallerIdentity
//!
//! The middleware injects a [`CallerIdentity`] into request extensions.
//! Handlers extract it via the `FromRequestParts` impl.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::{AppError, ErrorBody};
use crate::state::{AppState, SessionRecord};

/// Iterations for new password hashes.
pub const PASSWORD_HASH_ROUNDS: u32 = 100_000;

/// Upper bound accepted when verifying a stored hash.
const MAX_PASSWORD_HASH_ROUNDS: u32 = 10_000_000;

const PASSWORD_SCHEME: &str = "sha256i";
const SALT_LEN: usize = 16;
const SECRET_LEN: usize = 32;

// ── Role ────────────────────────────────────────────────────────────────────

/// Account roles, ordered by privilege level (`Customer < Admin`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shops, books visits, manages own cart/orders.
    Customer,
    /// Back office: catalog, pets, orders, reservations, users.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    /// The account behind a session. `None` for the static admin token.
    pub user_id: Option<Uuid>,
    /// The session used. `None` for the static admin token.
    pub session_id: Option<Uuid>,
}

impl CallerIdentity {
    /// Check if the caller has at least the given minimum role.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// The caller's account id, or 403 for the static admin token, which
    /// has no cart, orders or reservations of its own.
    pub fn require_user(&self) -> Result<Uuid, AppError> {
        self.user_id.ok_or_else(|| {
            AppError::Forbidden("this endpoint requires a user session".into())
        })
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role.
/// Returns 403 Forbidden if the caller's role is insufficient.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Hex / Constant-Time Helpers ─────────────────────────────────────────────

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

/// Constant-time comparison. When lengths differ a dummy comparison keeps
/// timing independent of the length match.
fn constant_time_eq(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

// ── Passwords ───────────────────────────────────────────────────────────────

fn derive(password: &[u8], salt: &[u8], rounds: u32) -> [u8; 32] {
    let mut digest: [u8; 32] = Sha256::new()
        .chain_update(salt)
        .chain_update(password)
        .finalize()
        .into();
    for _ in 1..rounds {
        digest = Sha256::new()
            .chain_update(digest)
            .chain_update(password)
            .finalize()
            .into();
    }
    digest
}

/// Hash a password with a fresh random salt and [`PASSWORD_HASH_ROUNDS`].
pub fn hash_password(password: &str) -> String {
    hash_password_with_rounds(password, PASSWORD_HASH_ROUNDS)
}

/// Hash a password with an explicit iteration count.
pub fn hash_password_with_rounds(password: &str, rounds: u32) -> String {
    let rounds = rounds.max(1);
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let digest = derive(password.as_bytes(), &salt, rounds);
    format!(
        "{PASSWORD_SCHEME}${rounds}${}${}",
        hex_encode(&salt),
        hex_encode(&digest)
    )
}

/// Check a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(rounds), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != PASSWORD_SCHEME {
        return false;
    }
    let Ok(rounds) = rounds.parse::<u32>() else {
        return false;
    };
    if rounds == 0 || rounds > MAX_PASSWORD_HASH_ROUNDS {
        return false;
    }
    let (Some(salt), Some(expected)) = (hex_decode(salt), hex_decode(expected)) else {
        return false;
    };
    let digest = derive(password.as_bytes(), &salt, rounds);
    constant_time_eq(&digest, &expected)
}

/// Hash on the blocking pool; the plaintext is zeroed when dropped.
pub async fn hash_password_blocking(password: Zeroizing<String>) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))
}

/// Verify on the blocking pool; the plaintext is zeroed when dropped.
pub async fn verify_password_blocking(
    password: Zeroizing<String>,
    stored: String,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))
}

// ── Sessions ────────────────────────────────────────────────────────────────

/// A freshly issued session. The token is shown to the client exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssuedSession {
    /// Bearer token: `{session_id}.{secret}`.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

fn hash_secret(secret: &str) -> String {
    hex_encode(&Sha256::digest(secret.as_bytes()))
}

/// Create and persist a session for a user. Expired sessions are swept first.
pub async fn issue_session(state: &AppState, user_id: Uuid) -> Result<IssuedSession, AppError> {
    sweep_expired_sessions(state).await;

    let mut secret_bytes = Zeroizing::new([0u8; SECRET_LEN]);
    OsRng.fill_bytes(&mut *secret_bytes);
    let secret = Zeroizing::new(hex_encode(&*secret_bytes));

    let now = Utc::now();
    let session = SessionRecord {
        id: Uuid::new_v4(),
        user_id,
        secret_hash: hash_secret(&secret),
        created_at: now,
        expires_at: now + Duration::hours(state.config.session_ttl_hours),
    };
    state.sessions.insert(session.id, session.clone());
    state.persist(&session).await?;

    tracing::info!(user_id = %user_id, session_id = %session.id, "session issued");
    Ok(IssuedSession {
        token: format!("{}.{}", session.id.simple(), secret.as_str()),
        expires_at: session.expires_at,
    })
}

/// Drop every expired session. Returns how many were removed.
///
/// Database delete failures are logged; the sessions are gone from memory
/// either way and are swept again on the next hydrate.
pub async fn sweep_expired_sessions(state: &AppState) -> usize {
    let now = Utc::now();
    let expired = state.sessions.remove_matching(|s| s.expires_at <= now);
    for session in &expired {
        if let Err(e) = state.persist_delete::<SessionRecord>(session.id).await {
            tracing::warn!(session_id = %session.id, error = %e, "failed to delete expired session");
        }
    }
    if !expired.is_empty() {
        tracing::info!(count = expired.len(), "expired sessions swept");
    }
    expired.len()
}

/// Revoke a session.
pub async fn revoke_session(state: &AppState, session_id: Uuid) -> Result<(), AppError> {
    state.sessions.remove(&session_id);
    state.persist_delete::<SessionRecord>(session_id).await
}

/// Resolve a bearer token to an identity.
///
/// The user's current role is read on every request, so role changes take
/// effect without re-login.
pub async fn resolve_token(state: &AppState, token: &str) -> Result<CallerIdentity, &'static str> {
    if let Some(expected) = &state.config.admin_token {
        if constant_time_eq(token.as_bytes(), expected.as_bytes()) {
            return Ok(CallerIdentity {
                role: Role::Admin,
                user_id: None,
                session_id: None,
            });
        }
    }

    let (id, secret) = token.split_once('.').ok_or("invalid bearer token")?;
    let session_id = Uuid::parse_str(id).map_err(|_| "invalid bearer token")?;
    let session = state
        .sessions
        .get(&session_id)
        .ok_or("invalid bearer token")?;

    if !constant_time_eq(hash_secret(secret).as_bytes(), session.secret_hash.as_bytes()) {
        return Err("invalid bearer token");
    }

    if session.expires_at <= Utc::now() {
        if let Err(e) = revoke_session(state, session_id).await {
            tracing::warn!(session_id = %session_id, error = %e, "failed to drop expired session");
        }
        return Err("session expired");
    }

    let user = state
        .users
        .get(&session.user_id)
        .ok_or("account no longer exists")?;

    Ok(CallerIdentity {
        role: user.role,
        user_id: Some(user.id),
        session_id: Some(session_id),
    })
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token and inject [`CallerIdentity`] into request
/// extensions. Missing, malformed, unknown or expired tokens get a 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    match auth_header {
        Some(header_value) if header_value.starts_with("Bearer ") => {
            let provided = header_value[7..].trim();
            match resolve_token(&state, provided).await {
                Ok(identity) => {
                    request.extensions_mut().insert(identity);
                    next.run(request).await
                }
                Err(msg) => {
                    tracing::warn!(reason = %msg, "authentication failed");
                    unauthorized_response(msg)
                }
            }
        }
        Some(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            unauthorized_response("authorization header must use Bearer scheme")
        }
        None => unauthorized_response("missing authorization header"),
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::new("UNAUTHORIZED", message)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::state::UserRecord;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn state_with_admin_token(token: &str) -> AppState {
        let config = AppConfig {
            admin_token: Some(Zeroizing::new(token.to_string())),
            ..AppConfig::default()
        };
        AppState::with_config(config, None, None)
    }

    fn add_user(state: &AppState, role: Role) -> Uuid {
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4().simple()),
            name: "Test".into(),
            phone: None,
            role,
            password_hash: hash_password_with_rounds("pw", 1),
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        user.id
    }

    fn test_app(state: AppState) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|caller: CallerIdentity| async move { caller.role.as_str() }),
            )
            .layer(from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn role_ordering() {
        assert!(Role::Admin > Role::Customer);
        let caller = CallerIdentity {
            role: Role::Customer,
            user_id: Some(Uuid::new_v4()),
            session_id: None,
        };
        assert!(require_role(&caller, Role::Customer).is_ok());
        assert!(matches!(
            require_role(&caller, Role::Admin),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn static_admin_has_no_user() {
        let caller = CallerIdentity {
            role: Role::Admin,
            user_id: None,
            session_id: None,
        };
        assert!(matches!(caller.require_user(), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn password_hash_verifies() {
        let stored = hash_password_with_rounds("correct horse", 10);
        assert!(stored.starts_with("sha256i$10$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = hash_password_with_rounds("pw", 2);
        let b = hash_password_with_rounds("pw", 2);
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hashes_never_match() {
        for stored in [
            "",
            "sha256i$10$zz$00",
            "md5$10$00$00",
            "sha256i$0$00$00",
            "sha256i$99999999999$00$00",
            "sha256i$10$00$00$extra",
        ] {
            assert!(!verify_password("pw", stored), "{stored}");
        }
    }

    #[test]
    fn hex_round_trip() {
        let bytes = [0u8, 1, 0xab, 0xff];
        assert_eq!(hex_encode(&bytes), "0001abff");
        assert_eq!(hex_decode("0001abff").unwrap(), bytes);
        assert!(hex_decode("abc").is_none());
    }

    #[tokio::test]
    async fn session_token_authenticates() {
        let state = AppState::new();
        let user_id = add_user(&state, Role::Customer);
        let issued = issue_session(&state, user_id).await.unwrap();

        let (status, body) =
            call(test_app(state), Some(format!("Bearer {}", issued.token).as_str())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "customer");
    }

    #[tokio::test]
    async fn role_change_applies_immediately() {
        let state = AppState::new();
        let user_id = add_user(&state, Role::Customer);
        let issued = issue_session(&state, user_id).await.unwrap();
        state.users.update(&user_id, |u| u.role = Role::Admin);

        let caller = resolve_token(&state, &issued.token).await.unwrap();
        assert_eq!(caller.role, Role::Admin);
        assert_eq!(caller.user_id, Some(user_id));
    }

    #[tokio::test]
    async fn tampered_secret_rejected() {
        let state = AppState::new();
        let user_id = add_user(&state, Role::Customer);
        let issued = issue_session(&state, user_id).await.unwrap();
        let (id, _) = issued.token.split_once('.').unwrap();
        let forged = format!("{id}.{}", "0".repeat(64));

        let (status, body) = call(test_app(state), Some(format!("Bearer {forged}").as_str())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("invalid"));
    }

    #[tokio::test]
    async fn expired_session_rejected_and_dropped() {
        let state = AppState::new();
        let user_id = add_user(&state, Role::Customer);
        let issued = issue_session(&state, user_id).await.unwrap();
        let session_id = Uuid::parse_str(issued.token.split_once('.').unwrap().0).unwrap();
        state
            .sessions
            .update(&session_id, |s| s.expires_at = Utc::now() - Duration::minutes(1));

        let err = resolve_token(&state, &issued.token).await.unwrap_err();
        assert_eq!(err, "session expired");
        assert!(!state.sessions.contains(&session_id));
    }

    #[tokio::test]
    async fn login_sweeps_other_expired_sessions() {
        let state = AppState::new();
        let user_id = add_user(&state, Role::Customer);
        let stale = issue_session(&state, user_id).await.unwrap();
        let stale_id = Uuid::parse_str(stale.token.split_once('.').unwrap().0).unwrap();
        state
            .sessions
            .update(&stale_id, |s| s.expires_at = Utc::now() - Duration::hours(1));
        let live = issue_session(&state, user_id).await.unwrap();

        assert!(!state.sessions.contains(&stale_id));
        assert_eq!(state.sessions.len(), 1);
        assert!(resolve_token(&state, &live.token).await.is_ok());
        assert_eq!(sweep_expired_sessions(&state).await, 0);
    }

    #[tokio::test]
    async fn revoked_session_rejected() {
        let state = AppState::new();
        let user_id = add_user(&state, Role::Customer);
        let issued = issue_session(&state, user_id).await.unwrap();
        let session_id = Uuid::parse_str(issued.token.split_once('.').unwrap().0).unwrap();
        revoke_session(&state, session_id).await.unwrap();
        assert!(resolve_token(&state, &issued.token).await.is_err());
    }

    #[tokio::test]
    async fn static_admin_token_accepted() {
        let state = state_with_admin_token("ops-secret");
        let (status, body) = call(test_app(state), Some("Bearer ops-secret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin");
    }

    #[tokio::test]
    async fn missing_and_non_bearer_rejected() {
        let state = state_with_admin_token("ops-secret");
        let (status, body) = call(test_app(state.clone()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
        assert!(err["error"]["message"].as_str().unwrap().contains("missing"));

        let (status, _) = call(test_app(state), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
