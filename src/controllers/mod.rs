pub mod bookings;
pub mod carousel;
pub mod dashboard;
pub mod events;
pub mod payments;
pub mod settings;
pub mod subscriptions;
pub mod users;

use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Success envelope shared by every handler.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { success: true, data })
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(events::routes())
        .merge(bookings::routes())
        .merge(payments::routes())
        .merge(users::routes())
        .merge(subscriptions::routes())
        .merge(settings::routes())
        .merge(carousel::routes())
        .merge(dashboard::routes())
}
