/// 令牌作用域内的限流与通知存储操作
pub mod notification;
pub mod rate_limit;
pub mod relay;

pub use notification::NotificationStore;
pub use rate_limit::{Decision, RateLimiter};
pub use relay::{Relay, WriteOutcome};

use crate::error::RelayError;

fn require_token(token: &str) -> Result<(), RelayError> {
    if token.is_empty() {
        return Err(RelayError::InvalidArgument("token must not be empty"));
    }
    Ok(())
}
