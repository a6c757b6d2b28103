use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment artifact recorded when the gateway redirects back.
/// `status` is whatever string the gateway reported.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub booking_id: Uuid,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub status: Option<String>,
}
