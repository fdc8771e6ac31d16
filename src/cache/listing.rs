use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::CacheService;
use crate::models::EventView;
use crate::query::{EventQuery, Page, PageRequest};

const LISTING_PREFIX: &str = "events:listing:";

impl CacheService {
    /// Key for one listing page; identical filters and window give identical keys.
    pub fn listing_key(query: &EventQuery, window: PageRequest) -> String {
        let material = format!(
            "{}&page={}&limit={}",
            query.canonical(),
            window.page,
            window.limit
        );
        let digest = Sha256::digest(material.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        format!("{LISTING_PREFIX}{hex}")
    }

    /// Cached page without per-user annotation.
    pub async fn get_listing(&self, key: &str) -> Option<Page<EventView>> {
        if !self.is_enabled() {
            return None;
        }
        let mut conn = self.redis.as_ref()?.conn.clone();
        let cached = match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("listing cache read failed: {:?}", e);
                return None;
            }
        };
        let page = serde_json::from_str(&cached?).ok();
        if page.is_some() {
            debug!("listing cache hit {}", key);
        }
        page
    }

    pub async fn put_listing(&self, key: &str, page: &Page<EventView>) {
        let Some(redis) = self.redis.as_ref().filter(|_| self.is_enabled()) else {
            return;
        };
        let Ok(json) = serde_json::to_string(page) else {
            return;
        };
        let mut conn = redis.conn.clone();
        let stored: redis::RedisResult<()> = conn.set_ex(key, json, self.ttl_seconds).await;
        if let Err(e) = stored {
            warn!("listing cache write failed: {:?}", e);
        }
    }

    /// Drops every cached listing page. Called after any event mutation.
    pub async fn invalidate_listings(&self) {
        let Some(redis) = self.redis.as_ref() else {
            return;
        };
        let mut conn = redis.conn.clone();
        let keys: Vec<String> = match redis::cmd("KEYS")
            .arg(format!("{LISTING_PREFIX}*"))
            .query_async(&mut conn)
            .await
        {
            Ok(keys) => keys,
            Err(e) => {
                warn!("listing cache invalidation failed: {:?}", e);
                return;
            }
        };
        if keys.is_empty() {
            return;
        }
        let deleted: redis::RedisResult<()> = conn.del(keys).await;
        if let Err(e) = deleted {
            warn!("listing cache invalidation failed: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::EventFilters;

    fn query(raw: &str) -> EventQuery {
        EventQuery::public(&EventFilters::from_query_string(raw).unwrap()).unwrap()
    }

    #[test]
    fn equivalent_filters_share_a_key() {
        let window = PageRequest::new(Some(1), Some(12), 12);
        assert_eq!(
            CacheService::listing_key(&query("category=all&price=all"), window),
            CacheService::listing_key(&query(""), window),
        );
    }

    #[test]
    fn different_windows_or_filters_differ() {
        let first = PageRequest::new(Some(1), Some(12), 12);
        let second = PageRequest::new(Some(2), Some(12), 12);
        let key = CacheService::listing_key(&query("price=free"), first);

        assert!(key.starts_with(LISTING_PREFIX));
        assert_ne!(key, CacheService::listing_key(&query("price=free"), second));
        assert_ne!(key, CacheService::listing_key(&query("price=paid"), first));
    }

    #[tokio::test]
    async fn disabled_cache_is_a_no_op() {
        let cache = CacheService::disabled();
        assert!(!cache.is_enabled());
        assert!(cache.get_listing("events:listing:x").await.is_none());
        cache.invalidate_listings().await;
    }
}
