use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use notify_relay::{AppState, clock::SystemClock, config::Config, routes};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置应用状态和存储后端
    let state = AppState::from_config(config.clone(), Arc::new(SystemClock))
        .expect("Failed to open notification store");
    if config.redis_url.is_none() {
        tracing::warn!("REDIS_URL not set, notifications are lost on restart");
    }
    tracing::info!(
        "Rate limit: {} requests per {}s",
        config.rate_limit.max_requests,
        config.rate_limit.window_secs
    );

    let router = routes::router(state);

    // 开发模式下允许跨域
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Notification relay listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
