use redis::{aio::MultiplexedConnection, Client};

#[derive(Clone)]
pub struct RedisClient {
    pub conn: MultiplexedConnection,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(RedisClient { conn })
    }

    /// Connects when a url is configured; connection failures disable the cache.
    pub async fn connect_optional(redis_url: Option<&str>) -> Option<Self> {
        let url = redis_url?;
        match Self::new(url).await {
            Ok(client) => {
                tracing::info!("Redis connected");
                Some(client)
            }
            Err(e) => {
                tracing::warn!("Redis unavailable, listing cache disabled: {:?}", e);
                None
            }
        }
    }
}
