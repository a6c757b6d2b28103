//! Payment reconciliation against the checkout gateway.
//!
//! The gateway redirects the payer back with `payment_id`, `status` and
//! `external_reference` (our booking id). Those parameters are trusted as
//! given. A success redirect performs two independent writes: the booking
//! row update, then the payment insert. If the second fails the booking
//! stays confirmed without a payment record.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    GatewayPayment, MercadoPagoClient, Notifier, Preference, PreferenceParams, ServiceError,
    ServiceResult,
};
use crate::models::{Booking, BookingStatus, NewPayment, Payment, PaymentStatus};
use crate::store::BookingStore;

pub const PAYMENT_METHOD: &str = "mercadopago";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectOutcome {
    Success,
    Failure,
    Pending,
}

/// Query string of a gateway back-URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedirectParams {
    pub payment_id: Option<String>,
    pub status: Option<String>,
    pub external_reference: Option<String>,
    pub payment_type: Option<String>,
    pub merchant_order_id: Option<String>,
    pub preference_id: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty() && *v != "null")
}

#[derive(Debug, Clone, Serialize)]
pub struct RedirectReport {
    pub outcome: RedirectOutcome,
    pub booking_id: Option<String>,
    pub payment_id: Option<String>,
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<Booking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<Payment>,
}

pub struct PaymentReconciler<S> {
    store: Arc<S>,
    gateway: MercadoPagoClient,
    notifier: Notifier,
}

impl<S> Clone for PaymentReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<S: BookingStore> PaymentReconciler<S> {
    pub fn new(store: Arc<S>, gateway: MercadoPagoClient, notifier: Notifier) -> Self {
        Self {
            store,
            gateway,
            notifier,
        }
    }

    pub fn public_key(&self) -> &str {
        self.gateway.public_key()
    }

    /// Opens a checkout session. Each call creates a new preference.
    pub async fn create_payment_preference(&self, params: &PreferenceParams) -> ServiceResult<Preference> {
        let preference = self.gateway.create_preference(params).await.map_err(|e| {
            error!(
                "Preference for booking {} failed, booking stays pending: {}",
                params.booking_id, e
            );
            e
        })?;
        Ok(preference)
    }

    /// New checkout session for a user's own booking that is still unpaid.
    pub async fn retry_preference(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        payer_name: &str,
    ) -> ServiceResult<Preference> {
        let details = self
            .store
            .booking_details(booking_id)
            .await?
            .filter(|d| d.booking.user_id == user_id)
            .ok_or(ServiceError::BookingNotFound)?;

        let booking = &details.booking;
        if booking.status != BookingStatus::Pending
            || booking.payment_status != PaymentStatus::Pending
            || booking.total_amount <= 0.0
        {
            return Err(ServiceError::NotPayable);
        }

        self.create_payment_preference(&PreferenceParams {
            booking_id: booking.id,
            title: format!("Reserva: {}", details.event_title),
            amount: booking.total_amount,
            payer_email: details.user_email.clone(),
            payer_name: payer_name.to_string(),
        })
        .await
    }

    pub async fn reconcile_redirect(
        &self,
        outcome: RedirectOutcome,
        params: RedirectParams,
    ) -> ServiceResult<RedirectReport> {
        let mut report = RedirectReport {
            outcome,
            booking_id: params.external_reference.clone(),
            payment_id: params.payment_id.clone(),
            status: params.status.clone(),
            booking: None,
            payment: None,
        };

        if outcome != RedirectOutcome::Success {
            info!(
                "Gateway redirect {:?}: reference={:?}, payment_id={:?}, status={:?}; booking left untouched",
                outcome, params.external_reference, params.payment_id, params.status
            );
            return Ok(report);
        }

        let (Some(payment_id), Some(reference)) =
            (present(&params.payment_id), present(&params.external_reference))
        else {
            warn!("Success redirect without payment_id or external_reference: {:?}", params);
            return Err(ServiceError::IncompleteRedirect);
        };

        let booking_id = Uuid::parse_str(reference).map_err(|_| {
            warn!("Success redirect with malformed external_reference {}", reference);
            ServiceError::BookingNotFound
        })?;

        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound)?;

        // 1. Confirm the booking
        let booking = self
            .store
            .set_state(booking.id, BookingStatus::Confirmed, PaymentStatus::Completed)
            .await?
            .ok_or(ServiceError::BookingNotFound)?;
        info!("Booking {} confirmed by gateway payment {}", booking.id, payment_id);

        // 2. Record the payment
        let payment = self
            .store
            .insert_payment(NewPayment {
                booking_id: booking.id,
                amount: booking.total_amount,
                payment_method: Some(PAYMENT_METHOD.to_string()),
                transaction_id: Some(payment_id.to_string()),
                status: Some(present(&params.status).unwrap_or("approved").to_string()),
            })
            .await
            .map_err(|e| {
                error!(
                    "Booking {} confirmed but payment {} was not recorded: {}",
                    booking.id, payment_id, e
                );
                e
            })?;

        // 3. Tell the payer
        match self.store.booking_details(booking.id).await {
            Ok(Some(details)) => self.notifier.payment_confirmation(&details, payment_id),
            Ok(None) => warn!("Booking {} details missing for payment email", booking.id),
            Err(e) => warn!("Could not load booking {} for payment email: {}", booking.id, e),
        }

        report.booking = Some(booking);
        report.payment = Some(payment);
        Ok(report)
    }

    /// Payment records of a booking, newest first. Non-admins only see their own.
    pub async fn payments_for_booking(
        &self,
        booking_id: Uuid,
        requester: Uuid,
        is_admin: bool,
    ) -> ServiceResult<Vec<Payment>> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .filter(|b| is_admin || b.user_id == requester)
            .ok_or(ServiceError::BookingNotFound)?;
        Ok(self.store.payments_for_booking(booking.id).await?)
    }

    /// Gateway view of a payment. Only numeric ids are forwarded.
    pub async fn payment_info(&self, payment_id: &str) -> ServiceResult<GatewayPayment> {
        let id = payment_id
            .trim()
            .parse::<u64>()
            .map_err(|_| ServiceError::InvalidPaymentId(payment_id.to_string()))?;
        Ok(self.gateway.payment_info(id).await?)
    }
}
