//! Booking lifecycle: creation, pricing and status overwrites.
//!
//! Status changes are unconditional single-row updates. There is no
//! transition table and no capacity reservation.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Notifier, ServiceError, ServiceResult};
use crate::models::booking::{initial_state, total_amount};
use crate::models::{
    Booking, BookingStatus, BookingSummary, Event, NewBooking, PaymentStatus, UserBooking,
};
use crate::store::BookingStore;

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub event_id: Uuid,
    pub user_id: Uuid,
    /// Defaults to 1 when absent.
    pub participants_count: Option<i32>,
    pub additional_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventAvailability {
    #[serde(flatten)]
    pub event: Event,
    pub booked_participants: i64,
    /// `None` when the event has no capacity limit.
    pub remaining_spots: Option<i64>,
}

pub struct BookingLifecycle<S> {
    store: Arc<S>,
    notifier: Notifier,
}

impl<S> Clone for BookingLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<S: BookingStore> BookingLifecycle<S> {
    pub fn new(store: Arc<S>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    pub async fn create(&self, request: CreateBooking) -> ServiceResult<Booking> {
        self.create_for_event(request).await.map(|(booking, _)| booking)
    }

    /// Inserts the booking and hands back the event it was priced against.
    pub(crate) async fn create_for_event(&self, request: CreateBooking) -> ServiceResult<(Booking, Event)> {
        let participants = request.participants_count.unwrap_or(1);
        if participants < 1 {
            return Err(ServiceError::InvalidParticipants(participants));
        }

        let event = self
            .store
            .find_event(request.event_id)
            .await?
            .ok_or(ServiceError::EventNotFound)?;

        let total = total_amount(event.price, participants);
        let (status, payment_status) = initial_state(total);

        let booking = self
            .store
            .insert_booking(NewBooking {
                event_id: event.id,
                user_id: request.user_id,
                participants_count: participants,
                total_amount: total,
                status,
                payment_status,
                additional_info: request.additional_info,
            })
            .await?;

        info!(
            "Booking {} created: event={}, participants={}, total={}, status={:?}",
            booking.id, event.id, participants, total, booking.status
        );

        if booking.status == BookingStatus::Confirmed {
            self.notify_confirmed(booking.id).await;
        }

        Ok((booking, event))
    }

    async fn notify_confirmed(&self, booking_id: Uuid) {
        match self.store.booking_details(booking_id).await {
            Ok(Some(details)) => self.notifier.booking_confirmation(&details),
            Ok(None) => warn!("Booking {} vanished before confirmation email", booking_id),
            Err(e) => warn!("Could not load booking {} for confirmation email: {}", booking_id, e),
        }
    }

    pub async fn find(&self, id: Uuid) -> ServiceResult<Booking> {
        self.store
            .find_booking(id)
            .await?
            .ok_or(ServiceError::BookingNotFound)
    }

    /// Overwrites `status`; any transition is accepted.
    pub async fn update_status(&self, id: Uuid, status: BookingStatus) -> ServiceResult<Booking> {
        let booking = self
            .store
            .set_status(id, status)
            .await?
            .ok_or(ServiceError::BookingNotFound)?;
        info!("Booking {} status set to {:?}", id, status);
        Ok(booking)
    }

    pub async fn update_payment_status(
        &self,
        id: Uuid,
        payment_status: PaymentStatus,
    ) -> ServiceResult<Booking> {
        let booking = self
            .store
            .set_payment_status(id, payment_status)
            .await?
            .ok_or(ServiceError::BookingNotFound)?;
        info!("Booking {} payment_status set to {:?}", id, payment_status);
        Ok(booking)
    }

    pub async fn event_availability(&self, event_id: Uuid) -> ServiceResult<EventAvailability> {
        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or(ServiceError::EventNotFound)?;
        let booked = self.store.booked_participants(event_id).await?;
        Ok(EventAvailability {
            remaining_spots: event.remaining_spots(booked),
            booked_participants: booked,
            event,
        })
    }

    pub async fn list_all(&self) -> ServiceResult<Vec<BookingSummary>> {
        Ok(self.store.list_bookings().await?)
    }

    pub async fn for_user(&self, user_id: Uuid) -> ServiceResult<Vec<UserBooking>> {
        Ok(self.store.bookings_for_user(user_id).await?)
    }

    /// Queues the check-in email for a booking.
    pub async fn send_checkin(&self, id: Uuid) -> ServiceResult<()> {
        let details = self
            .store
            .booking_details(id)
            .await?
            .ok_or(ServiceError::BookingNotFound)?;
        self.notifier.checkin(&details);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::sample_event;
    use crate::services::email::{disabled_notifier, recording_notifier, sent_emails, settled_emails};
    use crate::store::memory::MemoryStore;

    fn lifecycle() -> (Arc<MemoryStore>, BookingLifecycle<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), BookingLifecycle::new(store, disabled_notifier()))
    }

    fn request(event_id: Uuid, user_id: Uuid, participants: Option<i32>) -> CreateBooking {
        CreateBooking {
            event_id,
            user_id,
            participants_count: participants,
            additional_info: None,
        }
    }

    #[tokio::test]
    async fn free_event_is_confirmed_immediately() {
        let (store, lifecycle) = lifecycle();
        let event_id = store.add_event(sample_event(0.0, Some(20)));
        let user_id = store.add_user("rider@example.com", Some("Rider"));

        let booking = lifecycle.create(request(event_id, user_id, Some(3))).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Completed);
        assert_eq!(booking.total_amount, 0.0);
    }

    #[tokio::test]
    async fn free_booking_sends_one_confirmation_email() {
        let store = Arc::new(MemoryStore::new());
        let (emails, notifier) = recording_notifier().await;
        let lifecycle = BookingLifecycle::new(store.clone(), notifier);
        let event_id = store.add_event(sample_event(0.0, Some(20)));
        let user_id = store.add_user("rider@example.com", Some("Rider"));

        let booking = lifecycle.create(request(event_id, user_id, Some(2))).await.unwrap();

        let sent = sent_emails(&emails, 1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["template_id"], "tpl_booking");
        assert_eq!(sent[0]["template_params"]["booking_id"], booking.id.to_string());
        assert_eq!(sent[0]["template_params"]["to_name"], "Rider");
        assert_eq!(sent[0]["template_params"]["participants"], 2);
    }

    #[tokio::test]
    async fn priced_booking_sends_no_email_until_paid() {
        let store = Arc::new(MemoryStore::new());
        let (emails, notifier) = recording_notifier().await;
        let lifecycle = BookingLifecycle::new(store.clone(), notifier);
        let event_id = store.add_event(sample_event(15000.0, Some(20)));
        let user_id = store.add_user("rider@example.com", None);

        let booking = lifecycle.create(request(event_id, user_id, Some(1))).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(settled_emails(&emails).await.is_empty());
    }

    #[tokio::test]
    async fn priced_event_waits_for_payment() {
        let (store, lifecycle) = lifecycle();
        let event_id = store.add_event(sample_event(15000.0, Some(20)));
        let user_id = store.add_user("rider@example.com", None);

        let booking = lifecycle.create(request(event_id, user_id, Some(2))).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.total_amount, 30000.0);
    }

    #[tokio::test]
    async fn participants_default_to_one_and_must_be_positive() {
        let (store, lifecycle) = lifecycle();
        let event_id = store.add_event(sample_event(15000.0, None));
        let user_id = store.add_user("rider@example.com", None);

        let booking = lifecycle.create(request(event_id, user_id, None)).await.unwrap();
        assert_eq!(booking.participants_count, 1);
        assert_eq!(booking.total_amount, 15000.0);

        let err = lifecycle.create(request(event_id, user_id, Some(0))).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParticipants(0)));
        assert_eq!(store.bookings().len(), 1);
    }

    #[tokio::test]
    async fn unknown_event_is_rejected() {
        let (store, lifecycle) = lifecycle();
        let user_id = store.add_user("rider@example.com", None);

        let err = lifecycle.create(request(Uuid::new_v4(), user_id, None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::EventNotFound));
        assert!(store.bookings().is_empty());
    }

    #[tokio::test]
    async fn concurrent_bookings_for_last_spot_both_succeed() {
        let (store, lifecycle) = lifecycle();
        let event_id = store.add_event(sample_event(15000.0, Some(1)));
        let first = store.add_user("first@example.com", None);
        let second = store.add_user("second@example.com", None);

        let (a, b) = tokio::join!(
            lifecycle.create(request(event_id, first, None)),
            lifecycle.create(request(event_id, second, None)),
        );
        assert!(a.is_ok() && b.is_ok());

        let availability = lifecycle.event_availability(event_id).await.unwrap();
        assert_eq!(availability.booked_participants, 2);
        assert_eq!(availability.remaining_spots, Some(0));
    }

    #[tokio::test]
    async fn cancelling_keeps_amount_and_event() {
        let (store, lifecycle) = lifecycle();
        let event_id = store.add_event(sample_event(15000.0, None));
        let user_id = store.add_user("rider@example.com", None);
        let booking = lifecycle.create(request(event_id, user_id, Some(2))).await.unwrap();

        let cancelled = lifecycle
            .update_status(booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.total_amount, booking.total_amount);
        assert_eq!(cancelled.event_id, booking.event_id);
        assert_eq!(cancelled.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn cancelled_booking_can_be_confirmed_again() {
        let (store, lifecycle) = lifecycle();
        let event_id = store.add_event(sample_event(15000.0, None));
        let user_id = store.add_user("rider@example.com", None);
        let booking = lifecycle.create(request(event_id, user_id, None)).await.unwrap();

        lifecycle.update_status(booking.id, BookingStatus::Cancelled).await.unwrap();
        let revived = lifecycle
            .update_status(booking.id, BookingStatus::Confirmed)
            .await
            .unwrap();

        assert_eq!(revived.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn cancelled_bookings_free_their_spots() {
        let (store, lifecycle) = lifecycle();
        let event_id = store.add_event(sample_event(0.0, Some(10)));
        let user_id = store.add_user("rider@example.com", None);
        let booking = lifecycle.create(request(event_id, user_id, Some(4))).await.unwrap();

        assert_eq!(
            lifecycle.event_availability(event_id).await.unwrap().remaining_spots,
            Some(6)
        );
        lifecycle.update_status(booking.id, BookingStatus::Cancelled).await.unwrap();
        assert_eq!(
            lifecycle.event_availability(event_id).await.unwrap().remaining_spots,
            Some(10)
        );
    }

    #[tokio::test]
    async fn refund_touches_payment_status_only() {
        let (store, lifecycle) = lifecycle();
        let event_id = store.add_event(sample_event(0.0, None));
        let user_id = store.add_user("rider@example.com", None);
        let booking = lifecycle.create(request(event_id, user_id, None)).await.unwrap();

        let refunded = lifecycle
            .update_payment_status(booking.id, PaymentStatus::Refunded)
            .await
            .unwrap();
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
        assert_eq!(refunded.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn updating_unknown_booking_is_not_found() {
        let (_, lifecycle) = lifecycle();
        let err = lifecycle
            .update_status(Uuid::new_v4(), BookingStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BookingNotFound));
    }
}
