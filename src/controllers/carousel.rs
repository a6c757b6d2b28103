use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::ok;
use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::models::carousel::{NewSlide, SlideOrder, SlideUpdate};
use crate::models::CarouselSlide;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/carousel", get(active_slides).post(create_slide))
        .route("/carousel/reorder", put(reorder_slides))
        .route("/carousel/{id}", put(update_slide).delete(delete_slide))
        .route("/carousel/{id}/toggle", patch(toggle_slide))
        .route("/admin/carousel", get(all_slides))
}

fn slide_not_found() -> AppError {
    AppError::NotFound("Slide no encontrado".to_string())
}

// GET /api/carousel
async fn active_slides(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    Ok(ok(CarouselSlide::active(&state.db.pool).await?))
}

// GET /api/admin/carousel
async fn all_slides(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(ok(CarouselSlide::all(&state.db.pool).await?))
}

// POST /api/carousel
async fn create_slide(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(slide): Json<NewSlide>,
) -> AppResult<impl IntoResponse> {
    slide.validate()?;
    let slide = CarouselSlide::create(&state.db.pool, &slide).await?;
    Ok((StatusCode::CREATED, ok(slide)))
}

// PUT /api/carousel/{id}
async fn update_slide(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(changes): Json<SlideUpdate>,
) -> AppResult<impl IntoResponse> {
    changes.validate()?;
    let slide = CarouselSlide::update(&state.db.pool, id, &changes)
        .await?
        .ok_or_else(slide_not_found)?;
    Ok(ok(slide))
}

// DELETE /api/carousel/{id}
async fn delete_slide(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    if !CarouselSlide::delete(&state.db.pool, id).await? {
        return Err(slide_not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/carousel/reorder
async fn reorder_slides(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(orders): Json<Vec<SlideOrder>>,
) -> AppResult<impl IntoResponse> {
    let failed = CarouselSlide::reorder(&state.db.pool, &orders).await;
    if failed > 0 {
        return Err(AppError::Internal(format!(
            "{} of {} carousel order updates failed",
            failed,
            orders.len()
        )));
    }
    Ok(ok(serde_json::json!({ "updated": orders.len() })))
}

// PATCH /api/carousel/{id}/toggle
#[derive(Debug, Deserialize)]
struct ToggleRequest {
    is_active: bool,
}

async fn toggle_slide(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> AppResult<impl IntoResponse> {
    let slide = CarouselSlide::set_active(&state.db.pool, id, req.is_active)
        .await?
        .ok_or_else(slide_not_found)?;
    Ok(ok(slide))
}
