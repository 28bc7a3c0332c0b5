use axum::{
    extract::{Json, Query, State},
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use super::model::{NotificationsQuery, NotifyRequest, RateLimitedResponse};
use crate::AppState;
use crate::error::error_response;
use crate::operations::WriteOutcome;

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// 从 Authorization 头取出令牌，兼容不带 `Bearer ` 前缀的写法
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn rate_limit_headers(
    limit: u32,
    remaining: u32,
    reset_at: DateTime<Utc>,
) -> [(HeaderName, String); 3] {
    [
        (X_RATELIMIT_LIMIT, limit.to_string()),
        (X_RATELIMIT_REMAINING, remaining.to_string()),
        (X_RATELIMIT_RESET, reset_at.timestamp().to_string()),
    ]
}

#[axum::debug_handler]
pub async fn notify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NotifyRequest>,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "Missing Authorization header");
    };
    let message = match req.message {
        Some(message) if !message.is_empty() => message,
        _ => {
            return error_response(StatusCode::BAD_REQUEST, "Missing message in request body");
        }
    };

    match state.relay.submit(&token, &message).await {
        Ok(WriteOutcome::Admitted {
            notification,
            limit,
            remaining,
            reset_at,
        }) => (
            StatusCode::CREATED,
            rate_limit_headers(limit, remaining, reset_at),
            Json(notification),
        )
            .into_response(),
        Ok(WriteOutcome::Rejected {
            limit,
            reset_at,
            retry_after_seconds,
        }) => (
            StatusCode::TOO_MANY_REQUESTS,
            rate_limit_headers(limit, 0, reset_at),
            [(header::RETRY_AFTER, retry_after_seconds.to_string())],
            Json(RateLimitedResponse {
                error: "rate_limited",
                message: format!(
                    "Rate limit exceeded. Try again in {} seconds.",
                    retry_after_seconds
                ),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to store notification: {}", e);
            e.into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationsQuery>,
) -> Response {
    let Some(token) = query.token.filter(|token| !token.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing token parameter");
    };

    match state.relay.list(&token).await {
        Ok(notifications) => (StatusCode::OK, Json(notifications)).into_response(),
        Err(e) => {
            tracing::error!("Failed to get notifications: {}", e);
            e.into_response()
        }
    }
}
