use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use crate::{config::CacheConfig, database::Database, redis_client::RedisClient};

pub mod events;
pub mod settings;

pub const PUBLISHED_EVENTS_KEY: &str = "events:published";
pub const SETTINGS_MAP_KEY: &str = "settings:map";

/// Read-through Redis cache for the public catalogue and the settings map.
/// Redis problems are logged and fall back to Postgres.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
    config: CacheConfig,
}

impl CacheService {
    pub fn new(redis: RedisClient, db: Database, config: CacheConfig) -> Self {
        Self { redis, db, config }
    }

    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        match self.published_events().await {
            Ok(events) => info!("Cached {} published events", events.len()),
            Err(e) => warn!("Event warmup failed: {}", e),
        }
        match self.settings_map().await {
            Ok(settings) => info!("Cached {} site settings", settings.len()),
            Err(e) => warn!("Settings warmup failed: {}", e),
        }

        info!("Cache warmup done");
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = match conn.get(key).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Redis GET {} failed: {}", key, e);
                return None;
            }
        };
        data.and_then(|raw| serde_json::from_str(&raw).ok())
    }

    async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_seconds: u64) {
        let Ok(data) = serde_json::to_string(value) else {
            return;
        };
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<()> = conn.set_ex(key, data, ttl_seconds).await;
        if let Err(e) = result {
            warn!("Redis SET {} failed: {}", key, e);
        }
    }

    async fn invalidate(&self, key: &str) {
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<()> = conn.del(key).await;
        match result {
            Ok(()) => info!("Invalidated cache key {}", key),
            Err(e) => warn!("Redis DEL {} failed: {}", key, e),
        }
    }
}
