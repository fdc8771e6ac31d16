use crate::redis_client::RedisClient;

pub mod listing;

/// Redis-backed cache for public listing pages. A service built without a
/// connection is a no-op.
#[derive(Clone)]
pub struct CacheService {
    redis: Option<RedisClient>,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: Option<RedisClient>, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    pub fn disabled() -> Self {
        Self::new(None, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some() && self.ttl_seconds > 0
    }
}
