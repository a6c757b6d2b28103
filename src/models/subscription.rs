use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Monthly,
    Annual,
}

impl PlanType {
    /// List price of the plan in the configured currency.
    pub fn amount(self) -> f64 {
        match self {
            PlanType::Monthly => 5_000.0,
            PlanType::Annual => 50_000.0,
        }
    }

    pub fn end_date(self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = match self {
            PlanType::Monthly => 1,
            PlanType::Annual => 12,
        };
        start.checked_add_months(Months::new(months))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub async fn create(pool: &PgPool, user_id: Uuid, plan: PlanType) -> Result<Subscription, sqlx::Error> {
        let start = Utc::now();
        sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions (id, user_id, plan_type, status, start_date, end_date, amount)
             VALUES ($1, $2, $3, 'active', $4, $5, $6)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(plan)
        .bind(start)
        .bind(plan.end_date(start))
        .bind(plan.amount())
        .fetch_one(pool)
        .await
    }

    pub async fn for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }

    /// Cancels a subscription owned by `user_id`; `None` when no such row.
    pub async fn cancel(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(
            "UPDATE subscriptions SET status = 'cancelled'
             WHERE id = $1 AND user_id = $2
             RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn plan_prices() {
        assert_eq!(PlanType::Monthly.amount(), 5_000.0);
        assert_eq!(PlanType::Annual.amount(), 50_000.0);
    }

    #[test]
    fn end_dates_follow_calendar_months() {
        let start = Utc.with_ymd_and_hms(2025, 1, 31, 10, 0, 0).unwrap();
        let monthly = PlanType::Monthly.end_date(start).unwrap();
        assert_eq!(monthly, Utc.with_ymd_and_hms(2025, 2, 28, 10, 0, 0).unwrap());

        let annual = PlanType::Annual.end_date(start).unwrap();
        assert_eq!(annual, Utc.with_ymd_and_hms(2026, 1, 31, 10, 0, 0).unwrap());
    }
}
