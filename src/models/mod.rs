/// 存储中的数据模型
pub mod notification;
pub mod rate_limit;

pub use notification::Notification;
pub use rate_limit::RateLimitState;
