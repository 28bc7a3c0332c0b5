use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;
use crate::middleware::log_errors;

pub mod notification;

/// 构建 API 路由，挂载在 `api_base_uri` 下
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/notify", post(notification::notify))
        .route("/notifications", get(notification::list_notifications));

    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(base, api)
    };

    router
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
