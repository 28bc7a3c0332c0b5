use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{NotificationStore, RateLimiter};
use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::RelayError;
use crate::models::Notification;
use crate::store::KvStore;

/// 一次写入尝试的结果，被拒绝不是错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Admitted {
        notification: Notification,
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
    Rejected {
        limit: u32,
        reset_at: DateTime<Utc>,
        retry_after_seconds: u64,
    },
}

/// 写入先经过限流器，读取直接访问通知存储
pub struct Relay<S> {
    limiter: RateLimiter<S>,
    notifications: NotificationStore<S>,
}

impl<S: KvStore> Relay<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: RateLimitConfig) -> Self {
        Self {
            limiter: RateLimiter::new(store.clone(), clock.clone(), config),
            notifications: NotificationStore::new(store, clock),
        }
    }

    pub fn limiter(&self) -> &RateLimiter<S> {
        &self.limiter
    }

    pub fn notifications(&self) -> &NotificationStore<S> {
        &self.notifications
    }

    pub async fn submit(&self, token: &str, message: &str) -> Result<WriteOutcome, RelayError> {
        if message.is_empty() {
            return Err(RelayError::InvalidArgument("message must not be empty"));
        }

        let decision = self.limiter.check(token).await?;
        let limit = self.limiter.config().max_requests;

        if !decision.admitted {
            tracing::warn!("rate limit exceeded, resets at {}", decision.state.reset_at);
            return Ok(WriteOutcome::Rejected {
                limit,
                reset_at: decision.state.reset_at,
                retry_after_seconds: decision.state.retry_after_seconds(decision.checked_at),
            });
        }

        // 配额已经消耗，存储失败时不退还
        let notification = self.notifications.append(token, message).await?;

        Ok(WriteOutcome::Admitted {
            notification,
            limit,
            remaining: decision.state.remaining(limit),
            reset_at: decision.state.reset_at,
        })
    }

    pub async fn list(&self, token: &str) -> Result<Vec<Notification>, RelayError> {
        self.notifications.list(token).await
    }
}
