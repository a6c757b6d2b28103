//! Persistence seam for the booking lifecycle and payment reconciliation.
//!
//! Every method is a single statement against the backing store; nothing
//! here spans two writes, so callers get exactly the consistency of the
//! individual row update.

use std::future::Future;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Booking, BookingDetails, BookingStatus, BookingSummary, Event, NewBooking, NewPayment,
    Payment, PaymentStatus, UserBooking,
};

pub mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgBookingStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait BookingStore: Send + Sync {
    fn find_event(&self, event_id: Uuid) -> impl Future<Output = StoreResult<Option<Event>>> + Send;

    /// Sum of `participants_count` over non-cancelled bookings of the event.
    fn booked_participants(&self, event_id: Uuid) -> impl Future<Output = StoreResult<i64>> + Send;

    fn insert_booking(&self, booking: NewBooking) -> impl Future<Output = StoreResult<Booking>> + Send;

    fn find_booking(&self, id: Uuid) -> impl Future<Output = StoreResult<Option<Booking>>> + Send;

    fn booking_details(&self, id: Uuid) -> impl Future<Output = StoreResult<Option<BookingDetails>>> + Send;

    /// Overwrites `status` only. `None` when the booking does not exist.
    fn set_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> impl Future<Output = StoreResult<Option<Booking>>> + Send;

    /// Overwrites `payment_status` only.
    fn set_payment_status(
        &self,
        id: Uuid,
        payment_status: PaymentStatus,
    ) -> impl Future<Output = StoreResult<Option<Booking>>> + Send;

    /// Overwrites both status columns in one row update.
    fn set_state(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> impl Future<Output = StoreResult<Option<Booking>>> + Send;

    fn list_bookings(&self) -> impl Future<Output = StoreResult<Vec<BookingSummary>>> + Send;

    fn bookings_for_user(&self, user_id: Uuid) -> impl Future<Output = StoreResult<Vec<UserBooking>>> + Send;

    fn insert_payment(&self, payment: NewPayment) -> impl Future<Output = StoreResult<Payment>> + Send;

    fn payments_for_booking(&self, booking_id: Uuid) -> impl Future<Output = StoreResult<Vec<Payment>>> + Send;
}
