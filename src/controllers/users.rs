use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::ok;
use crate::error::{AppError, AppResult};
use crate::middleware::{AdminUser, AuthUser};
use crate::models::profile::{ProfileUpdate, RegisterRequest};
use crate::models::{Profile, Role};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/role", patch(update_role))
}

fn profile_not_found() -> AppError {
    AppError::NotFound("Perfil no encontrado".to_string())
}

// POST /api/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    if Profile::find_by_email(&state.db.pool, &req.email).await?.is_some() {
        return Err(AppError::Conflict("El email ya está registrado".to_string()));
    }

    let password = req.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let profile = Profile::create(&state.db.pool, &req.email, &password_hash, &req.full_name).await?;
    tracing::info!("Registered profile {} ({})", profile.id, profile.email);

    state.notifier.welcome(&profile.email, profile.full_name.as_deref());
    Ok((StatusCode::CREATED, ok(profile)))
}

// GET /api/profile
async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let profile = Profile::find(&state.db.pool, user.id)
        .await?
        .ok_or_else(profile_not_found)?;
    Ok(ok(profile))
}

// PUT /api/profile
async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(changes): Json<ProfileUpdate>,
) -> AppResult<impl IntoResponse> {
    changes.validate()?;
    let profile = Profile::update(&state.db.pool, user.id, &changes)
        .await?
        .ok_or_else(profile_not_found)?;
    Ok(ok(profile))
}

// GET /api/admin/users
async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(ok(Profile::all(&state.db.pool).await?))
}

// PATCH /api/admin/users/{id}/role
#[derive(Debug, Deserialize)]
struct RoleRequest {
    role: Role,
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RoleRequest>,
) -> AppResult<impl IntoResponse> {
    let profile = Profile::update_role(&state.db.pool, id, req.role)
        .await?
        .ok_or_else(profile_not_found)?;
    tracing::info!("Profile {} role set to {:?} by {}", id, req.role, admin.email);
    Ok(ok(profile))
}
