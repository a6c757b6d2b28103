use sqlx::PgPool;
use uuid::Uuid;

use super::{BookingStore, StoreResult};
use crate::models::{
    Booking, BookingDetails, BookingStatus, BookingSummary, Event, NewBooking, NewPayment,
    Payment, PaymentStatus, UserBooking,
};

const BOOKING_COLUMNS: &str = "id, event_id, user_id, participants_count, total_amount, status, \
     payment_status, additional_info, created_at";

#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl BookingStore for PgBookingStore {
    async fn find_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        Ok(Event::find(&self.pool, event_id).await?)
    }

    async fn booked_participants(&self, event_id: Uuid) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(participants_count), 0)::BIGINT
             FROM bookings
             WHERE event_id = $1 AND status <> 'cancelled'",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let row = sqlx::query_as::<_, Booking>(&format!(
            "INSERT INTO bookings (id, event_id, user_id, participants_count, total_amount,
                                   status, payment_status, additional_info)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(booking.event_id)
        .bind(booking.user_id)
        .bind(booking.participants_count)
        .bind(booking.total_amount)
        .bind(booking.status)
        .bind(booking.payment_status)
        .bind(booking.additional_info)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn booking_details(&self, id: Uuid) -> StoreResult<Option<BookingDetails>> {
        let row = sqlx::query_as::<_, BookingDetails>(
            r#"
            SELECT b.id, b.event_id, b.user_id, b.participants_count, b.total_amount,
                   b.status, b.payment_status, b.additional_info, b.created_at,
                   p.full_name AS user_full_name, p.email AS user_email,
                   e.title AS event_title, e.start_date AS event_start_date,
                   e.meeting_point AS event_meeting_point
            FROM bookings b
            JOIN profiles p ON p.id = b.user_id
            JOIN events e ON e.id = b.event_id
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_status(&self, id: Uuid, status: BookingStatus) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET status = $2 WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_payment_status(&self, id: Uuid, payment_status: PaymentStatus) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET payment_status = $2 WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(payment_status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_state(
        &self,
        id: Uuid,
        status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, Booking>(&format!(
            "UPDATE bookings SET status = $2, payment_status = $3 WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(payment_status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_bookings(&self) -> StoreResult<Vec<BookingSummary>> {
        let rows = sqlx::query_as::<_, BookingSummary>(
            r#"
            SELECT b.id, b.event_id, b.user_id, b.participants_count, b.total_amount,
                   b.status, b.payment_status, b.additional_info, b.created_at,
                   p.full_name AS user_full_name, p.email AS user_email,
                   e.title AS event_title, e.start_date AS event_start_date
            FROM bookings b
            JOIN profiles p ON p.id = b.user_id
            JOIN events e ON e.id = b.event_id
            ORDER BY b.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<UserBooking>> {
        let rows = sqlx::query_as::<_, UserBooking>(
            r#"
            SELECT b.id, b.event_id, b.user_id, b.participants_count, b.total_amount,
                   b.status, b.payment_status, b.additional_info, b.created_at,
                   e.title AS event_title, e.start_date AS event_start_date,
                   e.price AS event_price, e.meeting_point AS event_meeting_point
            FROM bookings b
            JOIN events e ON e.id = b.event_id
            WHERE b.user_id = $1
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_payment(&self, payment: NewPayment) -> StoreResult<Payment> {
        let row = sqlx::query_as::<_, Payment>(
            "INSERT INTO payments (id, booking_id, amount, payment_method, transaction_id, status)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(payment.booking_id)
        .bind(payment.amount)
        .bind(payment.payment_method)
        .bind(payment.transaction_id)
        .bind(payment.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn payments_for_booking(&self, booking_id: Uuid) -> StoreResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE booking_id = $1 ORDER BY created_at DESC",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
