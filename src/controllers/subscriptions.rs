use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::ok;
use crate::error::{AppError, AppResult};
use crate::middleware::{AdminUser, AuthUser};
use crate::models::{PlanType, Subscription};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/subscriptions", get(my_subscriptions).post(subscribe))
        .route("/subscriptions/{id}/cancel", post(cancel))
        .route("/admin/subscriptions", get(list_all))
}

// POST /api/subscriptions
#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    plan_type: PlanType,
}

async fn subscribe(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<SubscribeRequest>,
) -> AppResult<impl IntoResponse> {
    let subscription = Subscription::create(&state.db.pool, user.id, req.plan_type).await?;
    tracing::info!(
        "User {} subscribed to {:?} plan ({})",
        user.id, req.plan_type, subscription.amount
    );
    Ok((StatusCode::CREATED, ok(subscription)))
}

// GET /api/subscriptions
async fn my_subscriptions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    Ok(ok(Subscription::for_user(&state.db.pool, user.id).await?))
}

// POST /api/subscriptions/{id}/cancel
async fn cancel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let subscription = Subscription::cancel(&state.db.pool, id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Suscripción no encontrada".to_string()))?;
    Ok(ok(subscription))
}

// GET /api/admin/subscriptions
async fn list_all(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(ok(Subscription::all(&state.db.pool).await?))
}
