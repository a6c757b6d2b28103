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

use super::ok;
use crate::error::{AppError, AppResult};
use crate::middleware::{AdminUser, AuthUser};
use crate::models::{BookingStatus, PaymentStatus};
use crate::services::{CreateBooking, Payer};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(get_user_bookings).post(create_booking))
        .route("/bookings/{id}", get(get_booking))
        .route("/admin/bookings", get(list_bookings))
        .route("/admin/bookings/{id}/status", patch(update_status))
        .route("/admin/bookings/{id}/payment-status", patch(update_payment_status))
        .route("/admin/bookings/{id}/checkin", post(send_checkin))
}

/* ---------- BOOKINGS ---------- */

// POST /api/bookings
#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    event_id: Uuid,
    participants_count: Option<i32>,
    additional_info: Option<serde_json::Value>,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<impl IntoResponse> {
    let payer = Payer {
        email: user.email.clone(),
        name: user.display_name().to_string(),
    };
    let checkout = state
        .bookings
        .book(
            CreateBooking {
                event_id: req.event_id,
                user_id: user.id,
                participants_count: req.participants_count,
                additional_info: req.additional_info,
            },
            &payer,
        )
        .await?;

    Ok((StatusCode::CREATED, ok(checkout)))
}

// GET /api/bookings
async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    Ok(ok(state.bookings.lifecycle.for_user(user.id).await?))
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let booking = state.bookings.lifecycle.find(id).await?;
    if booking.user_id != user.id && !user.is_admin() {
        return Err(AppError::NotFound("Reserva no encontrada".to_string()));
    }
    Ok(ok(booking))
}

/* ---------- ADMIN ---------- */

// GET /api/admin/bookings
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(ok(state.bookings.lifecycle.list_all().await?))
}

// PATCH /api/admin/bookings/{id}/status
#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: BookingStatus,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> AppResult<impl IntoResponse> {
    let booking = state.bookings.lifecycle.update_status(id, req.status).await?;
    tracing::info!("Booking {} set to {:?} by {}", id, req.status, admin.email);
    Ok(ok(booking))
}

// PATCH /api/admin/bookings/{id}/payment-status
#[derive(Debug, Deserialize)]
struct PaymentStatusRequest {
    payment_status: PaymentStatus,
}

async fn update_payment_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<PaymentStatusRequest>,
) -> AppResult<impl IntoResponse> {
    let booking = state
        .bookings
        .lifecycle
        .update_payment_status(id, req.payment_status)
        .await?;
    tracing::info!(
        "Booking {} payment_status set to {:?} by {}",
        id, req.payment_status, admin.email
    );
    Ok(ok(booking))
}

// POST /api/admin/bookings/{id}/checkin
async fn send_checkin(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.bookings.lifecycle.send_checkin(id).await?;
    Ok((StatusCode::ACCEPTED, ok("Notificación de check-in en cola")))
}
