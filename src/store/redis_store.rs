use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient, Script};

use super::{KvStore, keys};
use crate::error::StoreError;

/// 每次 SCAN 的建议批量
const SCAN_BATCH: usize = 200;

/// 原子比较并写入
/// ARGV: 是否要求已存在, 期望值, 新值, 过期毫秒 (0 表示不过期)
const COMPARE_AND_SWAP: &str = r#"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '1' then
  if current ~= ARGV[2] then return 0 end
elseif current then
  return 0
end
if ARGV[4] == '0' then
  redis.call('SET', KEYS[1], ARGV[3])
else
  redis.call('SET', KEYS[1], ARGV[3], 'PX', ARGV[4])
end
return 1
"#;

/// Redis 存储后端
#[derive(Clone)]
pub struct RedisStore {
    client: Arc<RedisClient>,
    timeout: Duration,
    compare_and_swap: Arc<Script>,
}

impl RedisStore {
    pub fn new(client: RedisClient, timeout: Duration) -> Self {
        Self {
            client: Arc::new(client),
            timeout,
            compare_and_swap: Arc::new(Script::new(COMPARE_AND_SWAP)),
        }
    }

    /// 每个调用都受操作超时约束
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, redis::RedisError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        self.bounded(self.client.get_multiplexed_async_connection())
            .await
    }
}

fn ttl_millis(ttl: Option<Duration>) -> u64 {
    // 不足 1 毫秒的 TTL 向上取整，避免被当成永不过期
    ttl.map(|ttl| (ttl.as_millis() as u64).max(1)).unwrap_or(0)
}

impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = self.bounded(conn.get(key)).await?;
        tracing::debug!("redis GET {} -> {}", key, value.is_some());
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        match ttl_millis(ttl) {
            0 => {
                let _: () = self.bounded(conn.set(key, value)).await?;
            }
            millis => {
                let _: () = self.bounded(conn.pset_ex(key, value, millis)).await?;
            }
        }
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}*", keys::glob_escape(prefix));

        let mut found: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = self
                .bounded(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn),
                )
                .await?;
            found.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN 可能重复返回同一个键
        found.sort();
        found.dedup();
        if found.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = self.bounded(conn.mget(found.clone())).await?;
        tracing::debug!("redis SCAN {} -> {} keys", pattern, found.len());

        // 扫描与读取之间过期的键直接跳过
        Ok(found
            .into_iter()
            .zip(values)
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;

        let mut invocation = self.compare_and_swap.prepare_invoke();
        invocation
            .key(key)
            .arg(if expected.is_some() { "1" } else { "0" })
            .arg(expected.unwrap_or(""))
            .arg(value)
            .arg(ttl_millis(ttl));
        let swapped: i32 = self.bounded(invocation.invoke_async(&mut conn)).await?;

        Ok(swapped == 1)
    }
}
