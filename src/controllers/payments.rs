//! Gateway-facing endpoints: the three back-URLs the payer is redirected to,
//! payment retries for unpaid bookings and a few lookups.
//!
//! The back-URLs are unauthenticated and trust their query parameters.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{ok, ApiResponse};
use crate::error::AppResult;
use crate::middleware::{AdminUser, AuthUser};
use crate::services::{RedirectOutcome, RedirectParams, RedirectReport};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments/success", get(payment_success))
        .route("/payments/failure", get(payment_failure))
        .route("/payments/pending", get(payment_pending))
        .route("/payments/public-key", get(public_key))
        .route("/bookings/{id}/payment", post(retry_payment))
        .route("/bookings/{id}/payments", get(booking_payments))
        .route("/admin/payments/{payment_id}", get(gateway_payment))
}

/* ---------- REDIRECTS ---------- */

async fn reconcile(
    state: &AppState,
    outcome: RedirectOutcome,
    params: RedirectParams,
) -> AppResult<Json<ApiResponse<RedirectReport>>> {
    let report = state
        .bookings
        .payments
        .reconcile_redirect(outcome, params)
        .await?;
    Ok(ok(report))
}

// GET /api/payments/success
async fn payment_success(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RedirectParams>,
) -> AppResult<impl IntoResponse> {
    reconcile(&state, RedirectOutcome::Success, params).await
}

// GET /api/payments/failure
async fn payment_failure(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RedirectParams>,
) -> AppResult<impl IntoResponse> {
    reconcile(&state, RedirectOutcome::Failure, params).await
}

// GET /api/payments/pending
async fn payment_pending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RedirectParams>,
) -> AppResult<impl IntoResponse> {
    reconcile(&state, RedirectOutcome::Pending, params).await
}

/* ---------- CHECKOUT ---------- */

#[derive(Debug, Serialize)]
struct PaymentLink {
    preference_id: String,
    payment_url: String,
}

// POST /api/bookings/{id}/payment
async fn retry_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let preference = state
        .bookings
        .payments
        .retry_preference(id, user.id, user.display_name())
        .await?;
    Ok(ok(PaymentLink {
        preference_id: preference.id,
        payment_url: preference.init_point,
    }))
}

// GET /api/bookings/{id}/payments
async fn booking_payments(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let payments = state
        .bookings
        .payments
        .payments_for_booking(id, user.id, user.is_admin())
        .await?;
    Ok(ok(payments))
}

// GET /api/payments/public-key
async fn public_key(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ok(serde_json::json!({ "public_key": state.bookings.payments.public_key() }))
}

// GET /api/admin/payments/{payment_id}
async fn gateway_payment(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(payment_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    Ok(ok(state.bookings.payments.payment_info(&payment_id).await?))
}
