//! In-process `BookingStore` for exercising the booking flow without Postgres.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use super::{BookingStore, StoreError, StoreResult};
use crate::models::{
    Booking, BookingDetails, BookingStatus, BookingSummary, Event, NewBooking, NewPayment,
    Payment, PaymentStatus, UserBooking,
};

#[derive(Debug, Clone)]
pub struct MemoryUser {
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    events: Mutex<HashMap<Uuid, Event>>,
    users: Mutex<HashMap<Uuid, MemoryUser>>,
    bookings: Mutex<Vec<Booking>>,
    payments: Mutex<Vec<Payment>>,
    fail_payment_inserts: AtomicBool,
    fail_booking_updates: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&self, event: Event) -> Uuid {
        let id = event.id;
        self.events.lock().unwrap().insert(id, event);
        id
    }

    pub fn add_user(&self, email: &str, full_name: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().insert(
            id,
            MemoryUser {
                email: email.to_string(),
                full_name: full_name.map(str::to_string),
            },
        );
        id
    }

    pub fn fail_payment_inserts(&self, fail: bool) {
        self.fail_payment_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_booking_updates(&self, fail: bool) {
        self.fail_booking_updates.store(fail, Ordering::SeqCst);
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.bookings.lock().unwrap().clone()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.payments.lock().unwrap().clone()
    }

    fn update<F>(&self, id: Uuid, apply: F) -> StoreResult<Option<Booking>>
    where
        F: FnOnce(&mut Booking),
    {
        if self.fail_booking_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut bookings = self.bookings.lock().unwrap();
        Ok(bookings.iter_mut().find(|b| b.id == id).map(|booking| {
            apply(booking);
            booking.clone()
        }))
    }
}

impl BookingStore for MemoryStore {
    async fn find_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.events.lock().unwrap().get(&event_id).cloned())
    }

    async fn booked_participants(&self, event_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.event_id == event_id && b.status != BookingStatus::Cancelled)
            .map(|b| i64::from(b.participants_count))
            .sum())
    }

    async fn insert_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let row = Booking {
            id: Uuid::new_v4(),
            event_id: booking.event_id,
            user_id: booking.user_id,
            participants_count: booking.participants_count,
            total_amount: booking.total_amount,
            status: booking.status,
            payment_status: booking.payment_status,
            additional_info: booking.additional_info,
            created_at: Utc::now(),
        };
        self.bookings.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.bookings.lock().unwrap().iter().find(|b| b.id == id).cloned())
    }

    async fn booking_details(&self, id: Uuid) -> StoreResult<Option<BookingDetails>> {
        let Some(booking) = self.find_booking(id).await? else {
            return Ok(None);
        };
        let user = self.users.lock().unwrap().get(&booking.user_id).cloned();
        let event = self.events.lock().unwrap().get(&booking.event_id).cloned();
        Ok(match (user, event) {
            (Some(user), Some(event)) => Some(BookingDetails {
                booking,
                user_full_name: user.full_name,
                user_email: user.email,
                event_title: event.title,
                event_start_date: event.start_date,
                event_meeting_point: event.meeting_point,
            }),
            _ => None,
        })
    }

    async fn set_status(&self, id: Uuid, status: BookingStatus) -> StoreResult<Option<Booking>> {
        self.update(id, |b| b.status = status)
    }

    async fn set_payment_status(&self, id: Uuid, payment_status: PaymentStatus) -> StoreResult<Option<Booking>> {
        self.update(id, |b| b.payment_status = payment_status)
    }

    async fn set_state(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> StoreResult<Option<Booking>> {
        self.update(id, |b| {
            b.status = status;
            b.payment_status = payment_status;
        })
    }

    async fn list_bookings(&self) -> StoreResult<Vec<BookingSummary>> {
        let mut rows = Vec::new();
        for booking in self.bookings() {
            if let Some(details) = self.booking_details(booking.id).await? {
                rows.push(BookingSummary {
                    booking: details.booking,
                    user_full_name: details.user_full_name,
                    user_email: details.user_email,
                    event_title: details.event_title,
                    event_start_date: details.event_start_date,
                });
            }
        }
        rows.sort_by(|a, b| b.booking.created_at.cmp(&a.booking.created_at));
        Ok(rows)
    }

    async fn bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<UserBooking>> {
        let events = self.events.lock().unwrap().clone();
        let mut rows: Vec<UserBooking> = self
            .bookings()
            .into_iter()
            .filter(|b| b.user_id == user_id)
            .filter_map(|booking| {
                let event = events.get(&booking.event_id)?;
                Some(UserBooking {
                    event_title: event.title.clone(),
                    event_start_date: event.start_date,
                    event_price: event.price,
                    event_meeting_point: event.meeting_point.clone(),
                    booking,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.booking.created_at.cmp(&a.booking.created_at));
        Ok(rows)
    }

    async fn insert_payment(&self, payment: NewPayment) -> StoreResult<Payment> {
        if self.fail_payment_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let row = Payment {
            id: Uuid::new_v4(),
            booking_id: payment.booking_id,
            amount: payment.amount,
            payment_method: payment.payment_method,
            transaction_id: payment.transaction_id,
            status: payment.status,
            created_at: Utc::now(),
        };
        self.payments.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn payments_for_booking(&self, booking_id: Uuid) -> StoreResult<Vec<Payment>> {
        let mut rows: Vec<Payment> = self
            .payments()
            .into_iter()
            .filter(|p| p.booking_id == booking_id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}
