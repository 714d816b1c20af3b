use redis::{aio::MultiplexedConnection, Client};
use std::time::Duration;

use crate::error::AppResult;

#[derive(Clone)]
pub struct RedisClient {
    conn: MultiplexedConnection,
}

impl RedisClient {
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }

    /// Increments the counter for `key` and returns its new value. The key
    /// expires after `ttl`, so each counter lives for at most one window.
    pub async fn incr_window(&self, key: &str, ttl: Duration) -> AppResult<u64> {
        let mut conn = self.conn.clone();
        let key = format!("ratelimit:{}", key);
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .expire(&key, ttl.as_secs().max(1) as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }
}
