use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{RelayError, StoreError};
use crate::models::Notification;
use crate::store::{KvStore, keys};

/// 通知存储，每条通知一个键，按令牌前缀扫描还原列表
pub struct NotificationStore<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: KvStore> NotificationStore<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn append(&self, token: &str, message: &str) -> Result<Notification, RelayError> {
        super::require_token(token)?;
        if message.is_empty() {
            return Err(RelayError::InvalidArgument("message must not be empty"));
        }

        let notification = Notification::new(message, self.clock.now());
        let key = keys::notification_key(token, &notification.id);
        let json =
            serde_json::to_string(&notification).map_err(|e| StoreError::corrupt(&key, e))?;

        self.store.put(&key, &json, None).await?;
        tracing::debug!("stored notification {}", key);

        Ok(notification)
    }

    /// 令牌下的全部通知，最新的在前
    ///
    /// 按时间戳字符串排序，时间戳相同的保持扫描顺序。
    pub async fn list(&self, token: &str) -> Result<Vec<Notification>, RelayError> {
        super::require_token(token)?;

        let entries = self.store.scan(&keys::notifications_prefix(token)).await?;
        let mut notifications = entries
            .into_iter()
            .map(|(key, json)| {
                serde_json::from_str::<Notification>(&json).map_err(|e| StoreError::corrupt(&key, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(notifications)
    }
}
