//! Signup, login and the authorization gate.

use axum::{
    async_trait,
    body::Body,
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_required, validate_username};
use crate::auth::{hash_password, verify_password, Role, TokenService};
use crate::config::AuthConfig;
use crate::db::{
    DbPool, LoginRequest, LoginResponse, SessionUser, SignupRequest, SignupResponse, User,
    UserResponse,
};
use crate::AppState;

/// Identity decoded from a verified bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

/// Check the bearer token in `headers` and enforce the allowed role set.
///
/// An empty `allowed` set admits any authenticated caller.
pub fn authorize(
    headers: &HeaderMap,
    tokens: &TokenService,
    allowed: &[Role],
) -> Result<AuthUser, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?
        .trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized("Token not provided"));
    }

    let claims = tokens.verify(token)?;

    if !allowed.is_empty() && !allowed.contains(&claims.role) {
        return Err(ApiError::forbidden("Access denied"));
    }

    Ok(AuthUser {
        id: claims.sub,
        role: claims.role,
    })
}

/// Middleware for admin-only routes
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authorize(request.headers(), &state.tokens, &[Role::Admin])?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Middleware for routes open to any signed-in user
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authorize(request.headers(), &state.tokens, &[])?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for the identity attached by `require_admin` / `require_auth`
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
    }
}

/// Signup endpoint. New accounts always get role `user`.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let Json(request) = payload?;
    if request.username.is_empty() || request.email.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("All fields are required"));
    }

    let mut errors = ValidationErrorBuilder::new();
    errors.check("username", validate_username(&request.username));
    errors.check("email", validate_email(&request.email));
    errors.check("password", validate_required(&request.password, "Password"));
    errors.finish()?;

    if User::find_by_email(&state.db, &request.email).await?.is_some() {
        return Err(ApiError::conflict("Email already exists"));
    }

    let password_hash = hash_password(&request.password).map_err(|e| {
        ApiError::internal("Signup failed").with_error(format!("Failed to hash password: {}", e))
    })?;

    let user = User::create(
        &state.db,
        &request.username,
        &request.email,
        &password_hash,
        Role::User,
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        err if err.status() == StatusCode::CONFLICT => {
            ApiError::conflict("Username or email already exists")
        }
        err => err,
    })?;

    tracing::info!(user_id = user.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created".to_string(),
            user: UserResponse::from(user),
        }),
    ))
}

/// Login endpoint. Unknown email and wrong password are indistinguishable.
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    let user = User::find_by_email(&state.db, &request.email).await?;

    let user = match user {
        Some(user) if verify_password(&request.password, &user.password) => user,
        _ => return Err(ApiError::unauthorized("Invalid email or password")),
    };

    let token = state.tokens.issue(user.id, user.role())?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: SessionUser::from(&user),
    }))
}

/// Current session identity, for clients restoring a stored token
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<SessionUser>, ApiError> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;

    Ok(Json(SessionUser::from(&user)))
}

/// Ensure the configured admin account exists
pub async fn ensure_admin_user(db: &DbPool, config: &AuthConfig) -> anyhow::Result<()> {
    let (email, password) = match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => {
            tracing::debug!("No admin credentials configured, skipping admin bootstrap");
            return Ok(());
        }
    };

    if let Some(existing) = User::find_by_email(db, email).await? {
        if existing.role() != Role::Admin {
            tracing::warn!(%email, "Configured admin email belongs to a non-admin user");
        }
        return Ok(());
    }

    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    User::create(db, &config.admin_username, email, &password_hash, Role::Admin).await?;

    tracing::info!(%email, "Created admin user");
    Ok(())
}
