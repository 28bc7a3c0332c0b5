use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::{RelayError, StoreError};
use crate::models::RateLimitState;
use crate::store::{KvStore, keys};

/// 并发冲突时最多重试的次数
const MAX_CAS_ATTEMPTS: usize = 16;

/// 一次限流判定的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub admitted: bool,
    /// 放行时已包含本次请求的计数
    pub state: RateLimitState,
    pub checked_at: DateTime<Utc>,
}

/// 按令牌的固定窗口限流器
///
/// 只有限流器读写 `rate_limit:` 键空间。计数的读改写通过存储的
/// compare-and-swap 完成，同一令牌的并发请求不会超出上限。
pub struct RateLimiter<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
}

impl<S: KvStore> RateLimiter<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: RateLimitConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// 读取令牌当前窗口的状态，不存在或已过期时返回新窗口
    ///
    /// 第二个返回值是存储中实际读到的原始记录，用作 compare-and-swap 的期望值。
    pub async fn get_or_init(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(RateLimitState, Option<String>), RelayError> {
        let key = keys::rate_limit_key(token);
        let raw = self.store.get(&key).await?;

        let state = match raw.as_deref() {
            Some(json) => {
                let state: RateLimitState =
                    serde_json::from_str(json).map_err(|e| StoreError::corrupt(&key, e))?;
                if state.is_expired(now) {
                    RateLimitState::fresh(now, self.config.window())
                } else {
                    state
                }
            }
            None => RateLimitState::fresh(now, self.config.window()),
        };

        Ok((state, raw))
    }

    pub async fn check(&self, token: &str) -> Result<Decision, RelayError> {
        super::require_token(token)?;
        let key = keys::rate_limit_key(token);

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let now = self.clock.now();
            let (state, observed) = self.get_or_init(token, now).await?;

            if state.count >= self.config.max_requests {
                tracing::debug!("rate limit reached for {}, resets at {}", key, state.reset_at);
                return Ok(Decision {
                    admitted: false,
                    state,
                    checked_at: now,
                });
            }

            let next = RateLimitState {
                count: state.count + 1,
                ..state
            };
            let json = serde_json::to_string(&next).map_err(|e| StoreError::corrupt(&key, e))?;
            // 记录与窗口同时过期
            let ttl = (next.reset_at - now).to_std().unwrap_or_default();

            if self
                .store
                .compare_and_swap(&key, observed.as_deref(), &json, Some(ttl))
                .await?
            {
                return Ok(Decision {
                    admitted: true,
                    state: next,
                    checked_at: now,
                });
            }

            tracing::debug!("rate limit update for {} lost a race (attempt {})", key, attempt);
        }

        tracing::warn!("giving up on rate limit update for {} after {} attempts", key, MAX_CAS_ATTEMPTS);
        Err(RelayError::Contention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::TimeDelta;

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: ManualClock,
        limiter: Arc<RateLimiter<MemoryStore>>,
    }

    fn fixture(max_requests: u32, window_secs: u64) -> Fixture {
        let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let store = Arc::new(MemoryStore::new(Arc::new(clock.clone())));
        let limiter = Arc::new(RateLimiter::new(
            store.clone(),
            Arc::new(clock.clone()),
            RateLimitConfig {
                max_requests,
                window_secs,
            },
        ));
        Fixture {
            store,
            clock,
            limiter,
        }
    }

    async fn stored_state(store: &MemoryStore, token: &str) -> Option<RateLimitState> {
        store
            .get(&keys::rate_limit_key(token))
            .await
            .unwrap()
            .map(|json| serde_json::from_str(&json).unwrap())
    }

    #[tokio::test]
    async fn counts_up_in_call_order_within_window() {
        let f = fixture(10, 60);
        let start = f.clock.now();

        for expected in 1..=10u32 {
            f.clock.advance(TimeDelta::seconds(1));
            let decision = f.limiter.check("T").await.unwrap();
            assert!(decision.admitted);
            assert_eq!(decision.state.count, expected);
            assert_eq!(decision.state.reset_at, start + TimeDelta::seconds(61));
        }
    }

    #[tokio::test]
    async fn rejection_leaves_state_untouched() {
        let f = fixture(2, 60);
        f.limiter.check("T").await.unwrap();
        let at_limit = f.limiter.check("T").await.unwrap();
        assert!(at_limit.admitted);
        assert_eq!(at_limit.state.count, 2);

        for _ in 0..3 {
            f.clock.advance(TimeDelta::seconds(5));
            let decision = f.limiter.check("T").await.unwrap();
            assert!(!decision.admitted);
            assert_eq!(decision.state, at_limit.state);
        }
        assert_eq!(stored_state(&f.store, "T").await, Some(at_limit.state));
    }

    #[tokio::test]
    async fn expired_window_starts_fresh() {
        let f = fixture(3, 60);
        let now = f.clock.now();

        // 计数已满且窗口已过，记录没有 TTL 仍残留在存储中
        let stale = RateLimitState {
            count: 3,
            reset_at: now - TimeDelta::seconds(1),
        };
        f.store
            .put(
                &keys::rate_limit_key("T"),
                &serde_json::to_string(&stale).unwrap(),
                None,
            )
            .await
            .unwrap();

        let decision = f.limiter.check("T").await.unwrap();
        assert!(decision.admitted);
        assert_eq!(decision.state.count, 1);
        assert_eq!(decision.state.reset_at, now + TimeDelta::seconds(60));
    }

    #[tokio::test]
    async fn record_expires_with_window() {
        let f = fixture(1, 60);
        assert!(f.limiter.check("T").await.unwrap().admitted);
        assert!(!f.limiter.check("T").await.unwrap().admitted);

        f.clock.advance(TimeDelta::seconds(60));
        assert_eq!(stored_state(&f.store, "T").await, None);

        let decision = f.limiter.check("T").await.unwrap();
        assert!(decision.admitted);
        assert_eq!(decision.state.count, 1);
    }

    #[tokio::test]
    async fn tokens_are_isolated() {
        let f = fixture(1, 60);
        assert!(f.limiter.check("A").await.unwrap().admitted);
        assert!(!f.limiter.check("A").await.unwrap().admitted);

        let other = f.limiter.check("B").await.unwrap();
        assert!(other.admitted);
        assert_eq!(other.state.count, 1);
        assert_eq!(stored_state(&f.store, "A").await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn get_or_init_does_not_persist() {
        let f = fixture(5, 60);
        let now = f.clock.now();
        let (state, observed) = f.limiter.get_or_init("T", now).await.unwrap();

        assert_eq!(state, RateLimitState::fresh(now, TimeDelta::seconds(60)));
        assert_eq!(observed, None);
        assert_eq!(stored_state(&f.store, "T").await, None);
    }

    #[tokio::test]
    async fn empty_token_is_invalid() {
        let f = fixture(5, 60);
        let err = f.limiter.check("").await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidArgument(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_checks_never_exceed_limit() {
        let f = fixture(10, 60);

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let limiter = f.limiter.clone();
                tokio::spawn(async move { limiter.check("T").await })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().admitted {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 10);
        assert_eq!(stored_state(&f.store, "T").await.unwrap().count, 10);
    }
}
