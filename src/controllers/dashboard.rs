//! dashboard.rs
//!
//! Admin overview: bookings by status, confirmed revenue and headline counts.

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;

use super::ok;
use crate::error::AppResult;
use crate::middleware::AdminUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin/dashboard", get(get_dashboard_stats))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct DashboardStats {
    total_bookings: i64,
    pending_bookings: i64,
    confirmed_bookings: i64,
    cancelled_bookings: i64,
    /// Sum of `total_amount` over bookings whose payment is completed.
    total_revenue: f64,
    published_events: i64,
    total_users: i64,
    active_subscriptions: i64,
}

// GET /api/admin/dashboard
async fn get_dashboard_stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let stats = sqlx::query_as::<_, DashboardStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM bookings) AS total_bookings,
            (SELECT COUNT(*) FROM bookings WHERE status = 'pending') AS pending_bookings,
            (SELECT COUNT(*) FROM bookings WHERE status = 'confirmed') AS confirmed_bookings,
            (SELECT COUNT(*) FROM bookings WHERE status = 'cancelled') AS cancelled_bookings,
            (SELECT COALESCE(SUM(total_amount), 0)::float8 FROM bookings
                WHERE payment_status = 'completed') AS total_revenue,
            (SELECT COUNT(*) FROM events WHERE status = 'published') AS published_events,
            (SELECT COUNT(*) FROM profiles) AS total_users,
            (SELECT COUNT(*) FROM subscriptions WHERE status = 'active') AS active_subscriptions
        "#,
    )
    .fetch_one(&state.db.pool)
    .await?;

    Ok(ok(stats))
}
