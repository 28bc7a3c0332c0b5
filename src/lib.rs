use std::sync::Arc;

use clock::Clock;
use config::Config;
use error::StoreError;
use operations::Relay;
use store::Backend;

pub mod clock;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod operations;
pub mod routes;
pub mod store;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub relay: Arc<Relay<Backend>>,
}

impl AppState {
    pub fn new(config: Config, backend: Backend, clock: Arc<dyn Clock>) -> Self {
        let relay = Relay::new(Arc::new(backend), clock, config.rate_limit);
        Self {
            config,
            relay: Arc::new(relay),
        }
    }

    /// 按配置选择存储后端
    pub fn from_config(config: Config, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let backend = Backend::from_config(&config, clock.clone())?;
        tracing::info!("Using {} notification store", backend.name());
        Ok(Self::new(config, backend, clock))
    }
}
