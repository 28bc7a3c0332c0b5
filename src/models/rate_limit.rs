use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// 单个令牌在当前窗口内的限流状态
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitState {
    /// 从 `now` 开始的新窗口
    pub fn fresh(now: DateTime<Utc>, window: TimeDelta) -> Self {
        Self {
            count: 0,
            reset_at: now + window,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_at
    }

    pub fn remaining(&self, max_requests: u32) -> u32 {
        max_requests.saturating_sub(self.count)
    }

    /// 距离窗口重置的秒数，向上取整；窗口仍有效时至少为 1
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds();
        if millis <= 0 {
            return 0;
        }
        (millis as u64).div_ceil(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn fresh_window_ends_after_duration() {
        let state = RateLimitState::fresh(at(1_000), TimeDelta::seconds(60));
        assert_eq!(state.count, 0);
        assert_eq!(state.reset_at, at(1_060));
        assert!(!state.is_expired(at(1_059)));
        assert!(state.is_expired(at(1_060)));
    }

    #[test]
    fn retry_after_rounds_up() {
        let state = RateLimitState {
            count: 10,
            reset_at: at(1_060),
        };
        assert_eq!(state.retry_after_seconds(at(1_000)), 60);
        assert_eq!(
            state.retry_after_seconds(at(1_059) + TimeDelta::milliseconds(1)),
            1
        );
        assert_eq!(state.retry_after_seconds(at(1_060)), 0);
        assert_eq!(state.remaining(10), 0);
        assert_eq!(state.remaining(12), 2);
    }
}
