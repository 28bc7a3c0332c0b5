use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    pub token: Option<String>,
}

/// 429 响应体
#[derive(Debug, Serialize)]
pub struct RateLimitedResponse {
    pub error: &'static str,
    pub message: String,
}
