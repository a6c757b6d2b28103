use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use super::ok;
use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::models::setting::SettingInput;
use crate::models::SiteSetting;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/settings", get(all_settings).put(upsert_setting))
        .route("/settings/bulk", put(bulk_upsert))
        .route("/settings/{category}", get(category_settings))
        .route("/settings/{category}/{key}", get(get_setting).delete(delete_setting))
}

fn setting_not_found() -> AppError {
    AppError::NotFound("Configuración no encontrada".to_string())
}

/* ---------- PUBLIC ---------- */

// GET /api/settings
async fn all_settings(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    Ok(ok(state.cache.settings_map().await?))
}

// GET /api/settings/{category}
async fn category_settings(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> AppResult<impl IntoResponse> {
    Ok(ok(SiteSetting::by_category(&state.db.pool, &category).await?))
}

// GET /api/settings/{category}/{key}
async fn get_setting(
    State(state): State<Arc<AppState>>,
    Path((category, key)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let value = SiteSetting::value(&state.db.pool, &category, &key)
        .await?
        .ok_or_else(setting_not_found)?;
    Ok(ok(value))
}

/* ---------- ADMIN ---------- */

// PUT /api/settings
async fn upsert_setting(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(input): Json<SettingInput>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let setting = SiteSetting::upsert(&state.db.pool, &input, admin.id).await?;
    state.cache.invalidate_settings().await;
    Ok(ok(setting))
}

// PUT /api/settings/bulk
async fn bulk_upsert(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(inputs): Json<Vec<SettingInput>>,
) -> AppResult<impl IntoResponse> {
    for input in &inputs {
        input.validate()?;
    }
    let updated = SiteSetting::bulk_upsert(&state.db.pool, &inputs, admin.id).await?;
    state.cache.invalidate_settings().await;
    tracing::info!("{} settings updated by {}", updated, admin.email);
    Ok(ok(serde_json::json!({ "updated": updated })))
}

// DELETE /api/settings/{category}/{key}
async fn delete_setting(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path((category, key)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    if !SiteSetting::delete(&state.db.pool, &category, &key).await? {
        return Err(setting_not_found());
    }
    state.cache.invalidate_settings().await;
    Ok(StatusCode::NO_CONTENT)
}
