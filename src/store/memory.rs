use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use super::KvStore;
use crate::clock::Clock;
use crate::error::StoreError;

struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// 进程内存储，过期时间按注入的时钟计算
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(BTreeMap::new())),
            clock,
        }
    }

    fn entry(&self, value: &str, ttl: Option<Duration>, now: DateTime<Utc>) -> Entry {
        // 超出 chrono 可表示范围的 TTL 视为永不过期
        let expires_at = ttl
            .and_then(|ttl| TimeDelta::from_std(ttl).ok())
            .and_then(|ttl| now.checked_add_signed(ttl));
        Entry {
            value: value.to_string(),
            expires_at,
        }
    }
}

impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        let found = entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));
        match found {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let now = self.clock.now();
        let entry = self.entry(value, ttl, now);
        self.entries.lock().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.lock().await;

        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        let current = entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.as_str());
        if current != expected {
            return Ok(false);
        }

        let entry = self.entry(value, ttl, now);
        entries.insert(key.to_string(), entry);
        Ok(true)
    }
}
