//! 共享键值存储
//! 限流器与通知存储只通过这里的契约访问底层存储

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::Config;
use crate::error::StoreError;

pub mod keys;
mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// 有序键值存储，支持原子写入、可选过期和前缀扫描
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 返回以 `prefix` 开头的全部键值对，按键排序
    fn scan(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<(String, String)>, StoreError>> + Send;

    /// 当前值等于 `expected` 时才写入，`None` 表示键必须不存在
    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// 运行时选择的存储后端
#[derive(Clone)]
pub enum Backend {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Memory(_) => "memory",
            Backend::Redis(_) => "redis",
        }
    }

    /// 配置了 `REDIS_URL` 时连接 Redis，否则使用进程内存储
    pub fn from_config(
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        match &config.redis_url {
            Some(url) => {
                let client = ::redis::Client::open(url.as_str())?;
                Ok(Backend::Redis(RedisStore::new(client, config.redis_timeout())))
            }
            None => Ok(Backend::Memory(MemoryStore::new(clock))),
        }
    }
}

impl KvStore for Backend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Backend::Memory(store) => store.get(key).await,
            Backend::Redis(store) => store.get(key).await,
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        match self {
            Backend::Memory(store) => store.put(key, value, ttl).await,
            Backend::Redis(store) => store.put(key, value, ttl).await,
        }
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        match self {
            Backend::Memory(store) => store.scan(prefix).await,
            Backend::Redis(store) => store.scan(prefix).await,
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        match self {
            Backend::Memory(store) => store.compare_and_swap(key, expected, value, ttl).await,
            Backend::Redis(store) => store.compare_and_swap(key, expected, value, ttl).await,
        }
    }
}
