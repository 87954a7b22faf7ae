use std::time::Duration;

use application::rate_limiter::{CounterStore, CounterStoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;

// 已达上限时不自增；首次自增时设置过期时间，窗口从第一次提交开始计算
const INCREMENT_AND_CHECK: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current >= tonumber(ARGV[1]) then
    return 1
end
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
end
return 0
"#;

const RELEASE: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current > 0 then
    redis.call('DECR', KEYS[1])
end
return 0
"#;

fn map_redis_err(err: redis::RedisError) -> CounterStoreError {
    if err.is_io_error()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
    {
        CounterStoreError::Unavailable(err.to_string())
    } else {
        CounterStoreError::Protocol(err.to_string())
    }
}

/// 基于 Redis 的计数存储，比较与自增在同一个 Lua 脚本里完成
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
    increment_and_check: redis::Script,
    release: redis::Script,
}

impl RedisCounterStore {
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_connection_manager().await?;
        Ok(Self::new(connection))
    }

    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            increment_and_check: redis::Script::new(INCREMENT_AND_CHECK),
            release: redis::Script::new(RELEASE),
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment_and_check(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<bool, CounterStoreError> {
        let mut conn = self.connection.clone();
        let window_seconds = window.as_secs().max(1);

        let exceeded: i64 = self
            .increment_and_check
            .key(key)
            .arg(limit)
            .arg(window_seconds)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_err)?;

        Ok(exceeded == 1)
    }

    async fn release(&self, key: &str) -> Result<(), CounterStoreError> {
        let mut conn = self.connection.clone();
        let _: i64 = self
            .release
            .key(key)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(())
    }
}
