use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub participants_count: i32,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub additional_info: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Row to insert; status fields are already decided by the caller.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub participants_count: i32,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub additional_info: Option<serde_json::Value>,
}

/// Price of a reservation: event price times headcount.
pub fn total_amount(price: f64, participants_count: i32) -> f64 {
    price * f64::from(participants_count)
}

/// Free bookings are confirmed and settled on creation; anything priced
/// waits for the gateway.
pub fn initial_state(total_amount: f64) -> (BookingStatus, PaymentStatus) {
    if total_amount > 0.0 {
        (BookingStatus::Pending, PaymentStatus::Pending)
    } else {
        (BookingStatus::Confirmed, PaymentStatus::Completed)
    }
}

// Admin listing: booking joined with profile and event
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub user_full_name: Option<String>,
    pub user_email: String,
    pub event_title: String,
    pub event_start_date: DateTime<Utc>,
}

// A user's own bookings with the trip they refer to
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserBooking {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub event_title: String,
    pub event_start_date: DateTime<Utc>,
    pub event_price: f64,
    pub event_meeting_point: Option<String>,
}

/// Everything a notification about a booking needs.
#[derive(Debug, Clone, FromRow)]
pub struct BookingDetails {
    #[sqlx(flatten)]
    pub booking: Booking,
    pub user_full_name: Option<String>,
    pub user_email: String,
    pub event_title: String,
    pub event_start_date: DateTime<Utc>,
    pub event_meeting_point: Option<String>,
}

impl BookingDetails {
    pub fn display_name(&self) -> String {
        self.user_full_name
            .clone()
            .unwrap_or_else(|| self.user_email.clone())
    }
}
