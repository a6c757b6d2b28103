use tracing::debug;

use crate::cache::{CacheService, PUBLISHED_EVENTS_KEY};
use crate::models::Event;

impl CacheService {
    /// Published events, soonest first.
    pub async fn published_events(&self) -> Result<Vec<Event>, sqlx::Error> {
        if let Some(events) = self.get_json::<Vec<Event>>(PUBLISHED_EVENTS_KEY).await {
            debug!("Published events served from cache");
            return Ok(events);
        }

        let events = Event::published(&self.db.pool).await?;
        self.set_json(PUBLISHED_EVENTS_KEY, &events, self.config.events_ttl_seconds)
            .await;
        Ok(events)
    }

    pub async fn invalidate_events(&self) {
        self.invalidate(PUBLISHED_EVENTS_KEY).await;
    }
}
