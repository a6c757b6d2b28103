use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::{
    BookingLifecycle, CreateBooking, MercadoPagoClient, Notifier, PaymentReconciler, Preference,
    PreferenceParams, ServiceResult,
};
use crate::models::{Booking, BookingStatus};
use crate::store::BookingStore;

/// Who pays for a checkout.
#[derive(Debug, Clone)]
pub struct Payer {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    pub booking: Booking,
    /// Gateway redirect target; absent for free bookings.
    pub payment_url: Option<String>,
    pub preference_id: Option<String>,
}

/// Booking creation followed, when the booking is priced, by a checkout
/// preference on the gateway.
pub struct BookingFlow<S> {
    pub lifecycle: BookingLifecycle<S>,
    pub payments: PaymentReconciler<S>,
}

impl<S> Clone for BookingFlow<S> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            payments: self.payments.clone(),
        }
    }
}

impl<S: BookingStore> BookingFlow<S> {
    pub fn new(store: Arc<S>, gateway: MercadoPagoClient, notifier: Notifier) -> Self {
        Self {
            lifecycle: BookingLifecycle::new(store.clone(), notifier.clone()),
            payments: PaymentReconciler::new(store, gateway, notifier),
        }
    }

    /// A gateway failure is returned as an error; the booking already
    /// inserted stays pending and can be paid later through a retry.
    pub async fn book(&self, request: CreateBooking, payer: &Payer) -> ServiceResult<Checkout> {
        let (booking, event) = self.lifecycle.create_for_event(request).await?;

        if booking.status != BookingStatus::Pending {
            return Ok(Checkout {
                booking,
                payment_url: None,
                preference_id: None,
            });
        }

        let Preference { id, init_point } = self
            .payments
            .create_payment_preference(&PreferenceParams {
                booking_id: booking.id,
                title: format!("Reserva: {}", event.title),
                amount: booking.total_amount,
                payer_email: payer.email.clone(),
                payer_name: payer.name.clone(),
            })
            .await?;

        info!("Booking {} awaiting payment on preference {}", booking.id, id);
        Ok(Checkout {
            booking,
            payment_url: Some(init_point),
            preference_id: Some(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::sample_event;
    use crate::models::PaymentStatus;
    use crate::services::email::disabled_notifier;
    use crate::services::gateway::test_client;
    use crate::services::{RedirectOutcome, RedirectParams, ServiceError};
    use crate::store::memory::MemoryStore;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use fake::Fake;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payer() -> Payer {
        Payer {
            email: SafeEmail().fake(),
            name: Name().fake(),
        }
    }

    fn flow(store: &Arc<MemoryStore>, server: &MockServer) -> BookingFlow<MemoryStore> {
        BookingFlow::new(store.clone(), test_client(&server.uri(), 5), disabled_notifier())
    }

    fn request(event_id: Uuid, user_id: Uuid, participants: i32) -> CreateBooking {
        CreateBooking {
            event_id,
            user_id,
            participants_count: Some(participants),
            additional_info: Some(json!({ "bike_rental": true })),
        }
    }

    #[tokio::test]
    async fn free_booking_never_reaches_the_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let event_id = store.add_event(sample_event(0.0, Some(30)));
        let user_id = store.add_user("rider@example.com", None);

        let checkout = flow(&store, &server)
            .book(request(event_id, user_id, 2), &payer())
            .await
            .unwrap();

        assert_eq!(checkout.booking.status, BookingStatus::Confirmed);
        assert_eq!(checkout.booking.payment_status, PaymentStatus::Completed);
        assert!(checkout.payment_url.is_none());
    }

    #[tokio::test]
    async fn priced_booking_opens_exactly_one_preference() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let event_id = store.add_event(sample_event(15000.0, Some(30)));
        let user_id = store.add_user("rider@example.com", None);
        let payer = payer();

        Mock::given(method("POST"))
            .and(path("/checkout/preferences"))
            .and(body_partial_json(json!({
                "items": [{ "title": "Reserva: Travesía Cerro Catedral", "unit_price": 45000.0 }],
                "payer": { "email": payer.email }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "pref-1",
                "init_point": "https://www.mercadopago.com.ar/checkout/v1/redirect?pref_id=pref-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let checkout = flow(&store, &server)
            .book(request(event_id, user_id, 3), &payer)
            .await
            .unwrap();

        assert_eq!(checkout.booking.status, BookingStatus::Pending);
        assert_eq!(checkout.booking.payment_status, PaymentStatus::Pending);
        assert_eq!(checkout.preference_id.as_deref(), Some("pref-1"));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["external_reference"], checkout.booking.id.to_string());
    }

    #[tokio::test]
    async fn gateway_failure_leaves_booking_pending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let event_id = store.add_event(sample_event(15000.0, None));
        let user_id = store.add_user("rider@example.com", None);

        let err = flow(&store, &server)
            .book(request(event_id, user_id, 1), &payer())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Gateway(_)));
        let bookings = store.bookings();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].status, BookingStatus::Pending);
        assert_eq!(bookings[0].payment_status, PaymentStatus::Pending);
        assert!(store.payments().is_empty());
    }

    #[tokio::test]
    async fn full_checkout_then_approved_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checkout/preferences"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "pref-2",
                "init_point": "https://www.mercadopago.com.ar/checkout/v1/redirect?pref_id=pref-2"
            })))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let event_id = store.add_event(sample_event(20000.0, Some(12)));
        let user_id = store.add_user("rider@example.com", Some("Rider"));
        let flow = flow(&store, &server);

        let checkout = flow.book(request(event_id, user_id, 1), &payer()).await.unwrap();
        let query = format!(
            "payment_id=13579&status=approved&external_reference={}&preference_id=pref-2",
            checkout.booking.id
        );
        let params: RedirectParams = serde_urlencoded::from_str(&query).unwrap();

        flow.payments
            .reconcile_redirect(RedirectOutcome::Success, params)
            .await
            .unwrap();

        let booking = flow.lifecycle.find(checkout.booking.id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Completed);

        let payments = flow
            .payments
            .payments_for_booking(booking.id, user_id, false)
            .await
            .unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].transaction_id.as_deref(), Some("13579"));
        assert_eq!(payments[0].amount, 20000.0);
    }

    #[tokio::test]
    async fn retry_creates_a_fresh_preference_for_pending_booking() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checkout/preferences"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "pref-3",
                "init_point": "https://www.mercadopago.com.ar/checkout/v1/redirect?pref_id=pref-3"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let event_id = store.add_event(sample_event(10000.0, None));
        let user_id = store.add_user("rider@example.com", Some("Rider"));
        let flow = flow(&store, &server);

        let checkout = flow.book(request(event_id, user_id, 1), &payer()).await.unwrap();
        let retry = flow
            .payments
            .retry_preference(checkout.booking.id, user_id, "Rider")
            .await
            .unwrap();
        assert_eq!(retry.id, "pref-3");

        let stranger = flow
            .payments
            .retry_preference(checkout.booking.id, Uuid::new_v4(), "Someone")
            .await
            .unwrap_err();
        assert!(matches!(stranger, ServiceError::BookingNotFound));
    }
}
