use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Local,
    Provincial,
    International,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
    Finished,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub event_type: EventType,
    pub difficulty: Difficulty,
    pub start_date: DateTime<Utc>,
    pub duration: Option<String>,
    pub distance_km: Option<f64>,
    pub elevation_gain: Option<f64>,
    pub meeting_point: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub max_participants: Option<i32>,
    pub price: f64,
    pub images: Vec<String>,
    pub includes: Vec<String>,
    pub requirements: Vec<String>,
    pub status: EventStatus,
    pub instagram_url: Option<String>,
    pub tiktok_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Spots left for display. `None` means the event has no capacity limit.
    /// Nothing reserves these spots; concurrent bookings may overshoot.
    pub fn remaining_spots(&self, booked_participants: i64) -> Option<i64> {
        self.max_participants
            .map(|max| (i64::from(max) - booked_participants).max(0))
    }
}

/// Admin payload for creating or replacing an event.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EventInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub difficulty: Difficulty,
    pub start_date: DateTime<Utc>,
    pub duration: Option<String>,
    #[validate(range(min = 0.0))]
    pub distance_km: Option<f64>,
    pub elevation_gain: Option<f64>,
    pub meeting_point: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub location_lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub location_lng: Option<f64>,
    #[validate(range(min = 1))]
    pub max_participants: Option<i32>,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub status: Option<EventStatus>,
    #[validate(url)]
    pub instagram_url: Option<String>,
    #[validate(url)]
    pub tiktok_url: Option<String>,
}

const EVENT_COLUMNS: &str = "id, title, description, type, difficulty, start_date, duration, \
     distance_km, elevation_gain, meeting_point, location_lat, location_lng, max_participants, \
     price, images, includes, requirements, status, instagram_url, tiktok_url, created_at, updated_at";

impl Event {
    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn published(pool: &PgPool) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE status = 'published' ORDER BY start_date ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY start_date ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &PgPool, input: &EventInput) -> Result<Event, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (id, title, description, type, difficulty, start_date, duration,
                distance_km, elevation_gain, meeting_point, location_lat, location_lng,
                max_participants, price, images, includes, requirements, status,
                instagram_url, tiktok_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.event_type)
        .bind(input.difficulty)
        .bind(input.start_date)
        .bind(&input.duration)
        .bind(input.distance_km)
        .bind(input.elevation_gain)
        .bind(&input.meeting_point)
        .bind(input.location_lat)
        .bind(input.location_lng)
        .bind(input.max_participants)
        .bind(input.price)
        .bind(&input.images)
        .bind(&input.includes)
        .bind(&input.requirements)
        .bind(input.status.unwrap_or(EventStatus::Draft))
        .bind(&input.instagram_url)
        .bind(&input.tiktok_url)
        .fetch_one(pool)
        .await
    }

    pub async fn update(pool: &PgPool, id: Uuid, input: &EventInput) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events SET
                title = $2, description = $3, type = $4, difficulty = $5, start_date = $6,
                duration = $7, distance_km = $8, elevation_gain = $9, meeting_point = $10,
                location_lat = $11, location_lng = $12, max_participants = $13, price = $14,
                images = $15, includes = $16, requirements = $17,
                status = COALESCE($18, status),
                instagram_url = $19, tiktok_url = $20, updated_at = NOW()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.event_type)
        .bind(input.difficulty)
        .bind(input.start_date)
        .bind(&input.duration)
        .bind(input.distance_km)
        .bind(input.elevation_gain)
        .bind(&input.meeting_point)
        .bind(input.location_lat)
        .bind(input.location_lng)
        .bind(input.max_participants)
        .bind(input.price)
        .bind(&input.images)
        .bind(&input.includes)
        .bind(&input.requirements)
        .bind(input.status)
        .bind(&input.instagram_url)
        .bind(&input.tiktok_url)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}

#[cfg(test)]
pub(crate) fn sample_event(price: f64, max_participants: Option<i32>) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        title: "Travesía Cerro Catedral".to_string(),
        description: Some("Salida de día completo".to_string()),
        event_type: EventType::Local,
        difficulty: Difficulty::Intermediate,
        start_date: now + chrono::Duration::days(14),
        duration: Some("6h".to_string()),
        distance_km: Some(42.0),
        elevation_gain: Some(1200.0),
        meeting_point: Some("Base Cerro Catedral".to_string()),
        location_lat: None,
        location_lng: None,
        max_participants,
        price,
        images: vec![],
        includes: vec!["Guía".to_string()],
        requirements: vec!["Casco".to_string()],
        status: EventStatus::Published,
        instagram_url: None,
        tiktok_url: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_spots_is_floored_at_zero() {
        let event = sample_event(5000.0, Some(10));
        assert_eq!(event.remaining_spots(3), Some(7));
        assert_eq!(event.remaining_spots(12), Some(0));
    }

    #[test]
    fn unlimited_capacity_has_no_remaining_figure() {
        let event = sample_event(0.0, None);
        assert_eq!(event.remaining_spots(250), None);
    }

    #[test]
    fn event_type_serializes_under_type_key() {
        let json = serde_json::to_value(sample_event(0.0, None)).unwrap();
        assert_eq!(json["type"], "local");
        assert_eq!(json["status"], "published");
    }
}
