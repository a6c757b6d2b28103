use std::collections::BTreeMap;

use crate::cache::{CacheService, SETTINGS_MAP_KEY};
use crate::models::SiteSetting;

impl CacheService {
    /// Every setting as `category.key -> value`.
    pub async fn settings_map(&self) -> Result<BTreeMap<String, serde_json::Value>, sqlx::Error> {
        if let Some(map) = self.get_json(SETTINGS_MAP_KEY).await {
            return Ok(map);
        }

        let map = SiteSetting::all_as_map(&self.db.pool).await?;
        self.set_json(SETTINGS_MAP_KEY, &map, self.config.settings_ttl_seconds)
            .await;
        Ok(map)
    }

    pub async fn invalidate_settings(&self) {
        self.invalidate(SETTINGS_MAP_KEY).await;
    }
}
