use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::ok;
use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::models::event::EventInput;
use crate::models::Event;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_published).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/admin/events", get(list_all))
}

/* ---------- PUBLIC ---------- */

// GET /api/events
async fn list_published(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let events = state.cache.published_events().await?;
    Ok(ok(events))
}

// GET /api/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let availability = state.bookings.lifecycle.event_availability(id).await?;
    Ok(ok(availability))
}

/* ---------- ADMIN ---------- */

// GET /api/admin/events
async fn list_all(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(ok(Event::all(&state.db.pool).await?))
}

// POST /api/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(input): Json<EventInput>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let event = Event::create(&state.db.pool, &input).await?;
    state.cache.invalidate_events().await;
    tracing::info!("Event {} created by {}", event.id, admin.email);
    Ok((StatusCode::CREATED, ok(event)))
}

// PUT /api/events/{id}
async fn update_event(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(input): Json<EventInput>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let event = Event::update(&state.db.pool, id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound("Evento no encontrado".to_string()))?;
    state.cache.invalidate_events().await;
    tracing::info!("Event {} updated by {}", id, admin.email);
    Ok(ok(event))
}

// DELETE /api/events/{id}
async fn delete_event(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    if !Event::delete(&state.db.pool, id).await? {
        return Err(AppError::NotFound("Evento no encontrado".to_string()));
    }
    state.cache.invalidate_events().await;
    tracing::info!("Event {} deleted by {}", id, admin.email);
    Ok(StatusCode::NO_CONTENT)
}
