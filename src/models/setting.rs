use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SiteSetting {
    pub id: Uuid,
    pub category: String,
    pub key: String,
    pub value: serde_json::Value,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SettingInput {
    #[validate(length(min = 1, max = 60))]
    pub category: String,
    #[validate(length(min = 1, max = 120))]
    pub key: String,
    pub value: serde_json::Value,
    pub description: Option<String>,
}

/// Flattens rows into a `category.key -> value` map.
pub fn settings_map(rows: Vec<(String, String, serde_json::Value)>) -> BTreeMap<String, serde_json::Value> {
    rows.into_iter()
        .map(|(category, key, value)| (format!("{}.{}", category, key), value))
        .collect()
}

const UPSERT_SQL: &str = r#"
    INSERT INTO site_settings (id, category, key, value, description, updated_by)
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (category, key) DO UPDATE SET
        value = EXCLUDED.value,
        description = COALESCE(EXCLUDED.description, site_settings.description),
        updated_by = EXCLUDED.updated_by,
        updated_at = NOW()
    RETURNING *
"#;

impl SiteSetting {
    pub async fn value(pool: &PgPool, category: &str, key: &str) -> Result<Option<serde_json::Value>, sqlx::Error> {
        sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT value FROM site_settings WHERE category = $1 AND key = $2",
        )
        .bind(category)
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    pub async fn by_category(pool: &PgPool, category: &str) -> Result<Vec<SiteSetting>, sqlx::Error> {
        sqlx::query_as::<_, SiteSetting>(
            "SELECT * FROM site_settings WHERE category = $1 ORDER BY key",
        )
        .bind(category)
        .fetch_all(pool)
        .await
    }

    pub async fn all_as_map(pool: &PgPool) -> Result<BTreeMap<String, serde_json::Value>, sqlx::Error> {
        let rows: Vec<(String, String, serde_json::Value)> =
            sqlx::query_as("SELECT category, key, value FROM site_settings")
                .fetch_all(pool)
                .await?;
        Ok(settings_map(rows))
    }

    pub async fn upsert(pool: &PgPool, input: &SettingInput, updated_by: Uuid) -> Result<SiteSetting, sqlx::Error> {
        sqlx::query_as::<_, SiteSetting>(UPSERT_SQL)
            .bind(Uuid::new_v4())
            .bind(&input.category)
            .bind(&input.key)
            .bind(&input.value)
            .bind(&input.description)
            .bind(updated_by)
            .fetch_one(pool)
            .await
    }

    /// Upserts every entry in one transaction.
    pub async fn bulk_upsert(pool: &PgPool, inputs: &[SettingInput], updated_by: Uuid) -> Result<usize, sqlx::Error> {
        let mut tx = pool.begin().await?;
        for input in inputs {
            sqlx::query(UPSERT_SQL)
                .bind(Uuid::new_v4())
                .bind(&input.category)
                .bind(&input.key)
                .bind(&input.value)
                .bind(&input.description)
                .bind(updated_by)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(inputs.len())
    }

    pub async fn delete(pool: &PgPool, category: &str, key: &str) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM site_settings WHERE category = $1 AND key = $2")
            .bind(category)
            .bind(key)
            .execute(pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}
