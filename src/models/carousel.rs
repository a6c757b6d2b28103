use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CarouselSlide {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSlide {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub subtitle: Option<String>,
    #[validate(url)]
    pub image_url: String,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SlideUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlideOrder {
    pub id: Uuid,
    pub display_order: i32,
}

impl CarouselSlide {
    pub async fn all(pool: &PgPool) -> Result<Vec<CarouselSlide>, sqlx::Error> {
        sqlx::query_as::<_, CarouselSlide>(
            "SELECT * FROM landing_carousel ORDER BY display_order ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn active(pool: &PgPool) -> Result<Vec<CarouselSlide>, sqlx::Error> {
        sqlx::query_as::<_, CarouselSlide>(
            "SELECT * FROM landing_carousel WHERE is_active = TRUE ORDER BY display_order ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Appends after the current last slide unless an order is given.
    pub async fn create(pool: &PgPool, slide: &NewSlide) -> Result<CarouselSlide, sqlx::Error> {
        let display_order = match slide.display_order {
            Some(order) => order,
            None => {
                let max: Option<i32> =
                    sqlx::query_scalar("SELECT MAX(display_order) FROM landing_carousel")
                        .fetch_one(pool)
                        .await?;
                max.unwrap_or(0) + 1
            }
        };

        sqlx::query_as::<_, CarouselSlide>(
            "INSERT INTO landing_carousel (id, title, subtitle, image_url, cta_text, cta_link, display_order)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&slide.title)
        .bind(&slide.subtitle)
        .bind(&slide.image_url)
        .bind(&slide.cta_text)
        .bind(&slide.cta_link)
        .bind(display_order)
        .fetch_one(pool)
        .await
    }

    pub async fn update(pool: &PgPool, id: Uuid, changes: &SlideUpdate) -> Result<Option<CarouselSlide>, sqlx::Error> {
        sqlx::query_as::<_, CarouselSlide>(
            "UPDATE landing_carousel SET
                title = COALESCE($2, title),
                subtitle = COALESCE($3, subtitle),
                image_url = COALESCE($4, image_url),
                cta_text = COALESCE($5, cta_text),
                cta_link = COALESCE($6, cta_link),
                display_order = COALESCE($7, display_order),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.subtitle)
        .bind(&changes.image_url)
        .bind(&changes.cta_text)
        .bind(&changes.cta_link)
        .bind(changes.display_order)
        .bind(changes.is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_active(pool: &PgPool, id: Uuid, is_active: bool) -> Result<Option<CarouselSlide>, sqlx::Error> {
        sqlx::query_as::<_, CarouselSlide>(
            "UPDATE landing_carousel SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM landing_carousel WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }

    /// Issues every order update concurrently; returns how many failed.
    /// Updates that succeeded are not rolled back.
    pub async fn reorder(pool: &PgPool, orders: &[SlideOrder]) -> usize {
        let updates = orders.iter().map(|slide| {
            sqlx::query(
                "UPDATE landing_carousel SET display_order = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(slide.id)
            .bind(slide.display_order)
            .execute(pool)
        });

        join_all(updates)
            .await
            .into_iter()
            .filter(|result| {
                if let Err(e) = result {
                    tracing::error!("carousel reorder update failed: {:?}", e);
                }
                result.is_err()
            })
            .count()
    }
}
