use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("store operation timed out after {0} ms")]
    Timeout(u64),

    #[error("corrupt record at {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn corrupt(key: &str, source: serde_json::Error) -> Self {
        StoreError::Corrupt {
            key: key.to_string(),
            source,
        }
    }
}

/// 限流与通知存储的错误
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("rate limit record for token is under contention")]
    Contention,
}

impl RelayError {
    /// 调用方可以稍后重试的错误
    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::Store(StoreError::Corrupt { .. }) => false,
            RelayError::Store(_) | RelayError::Contention => true,
            RelayError::InvalidArgument(_) => false,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    message: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            RelayError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            err if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// 直接返回的请求错误
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Json(ErrorResponse {
        code: status.as_u16(),
        message: message.into(),
    });
    (status, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(RelayError::Contention.is_retryable());
        assert!(RelayError::Store(StoreError::Timeout(2000)).is_retryable());
        assert!(!RelayError::InvalidArgument("token must not be empty").is_retryable());

        let corrupt = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(!RelayError::Store(StoreError::corrupt("k", corrupt)).is_retryable());
    }

    #[test]
    fn status_mapping() {
        let resp = RelayError::InvalidArgument("message must not be empty").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = RelayError::Store(StoreError::Timeout(5)).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
