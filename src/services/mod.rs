pub mod checkout;
pub mod email;
pub mod gateway;
pub mod lifecycle;
pub mod reconciliation;

use thiserror::Error;

use crate::store::StoreError;

pub use checkout::{BookingFlow, Checkout, Payer};
pub use email::{EmailClient, EmailError, Notifier};
pub use gateway::{GatewayError, GatewayPayment, MercadoPagoClient, Preference, PreferenceParams};
pub use lifecycle::{BookingLifecycle, CreateBooking, EventAvailability};
pub use reconciliation::{PaymentReconciler, RedirectOutcome, RedirectParams, RedirectReport};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("event not found")]
    EventNotFound,
    #[error("booking not found")]
    BookingNotFound,
    #[error("participants_count must be at least 1 (got {0})")]
    InvalidParticipants(i32),
    #[error("incomplete payment information")]
    IncompleteRedirect,
    #[error("booking has no pending payment")]
    NotPayable,
    #[error("invalid gateway payment id {0:?}")]
    InvalidPaymentId(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
