use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// 固定窗口限流参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// 每个窗口允许的最大写入次数
    pub max_requests: u32,
    /// 窗口长度（秒）
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> TimeDelta {
        TimeDelta::seconds(self.window_secs as i64)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    /// 未设置时使用进程内存储
    pub redis_url: Option<String>,
    pub redis_timeout_ms: u64,
    pub rate_limit: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            api_base_uri: "/api/v1".to_string(),
            redis_url: None,
            redis_timeout_ms: 2000,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let rate_limit = RateLimitConfig {
            max_requests: parse_or(
                &lookup,
                "RATE_LIMIT_REQUESTS",
                defaults.rate_limit.max_requests,
            )?,
            window_secs: parse_or(
                &lookup,
                "RATE_LIMIT_WINDOW",
                defaults.rate_limit.window_secs,
            )?,
        };
        if rate_limit.window_secs == 0 {
            return Err(ConfigError::Zero("RATE_LIMIT_WINDOW"));
        }

        Ok(Config {
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or(&lookup, "SERVER_PORT", defaults.server_port)?,
            api_base_uri: lookup("API_BASE_URI").unwrap_or(defaults.api_base_uri),
            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
            redis_timeout_ms: parse_or(&lookup, "REDIS_TIMEOUT_MS", defaults.redis_timeout_ms)?,
            rate_limit,
        })
    }

    pub fn redis_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.api_base_uri, "/api/v1");
        assert_eq!(config.redis_url, None);
        assert_eq!(config.rate_limit, RateLimitConfig::default());
        assert_eq!(config.rate_limit.window(), TimeDelta::seconds(60));
    }

    #[test]
    fn overrides_from_environment() {
        let config = Config::from_lookup(lookup(&[
            ("RATE_LIMIT_REQUESTS", "2"),
            ("RATE_LIMIT_WINDOW", " 30 "),
            ("REDIS_URL", "redis://127.0.0.1/"),
            ("SERVER_PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(config.rate_limit.max_requests, 2);
        assert_eq!(config.rate_limit.window_secs, 30);
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1/"));
        assert_eq!(config.server_port, 9000);
    }

    #[test]
    fn rejects_malformed_or_zero_window() {
        let err = Config::from_lookup(lookup(&[("RATE_LIMIT_REQUESTS", "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "RATE_LIMIT_REQUESTS", .. }));

        let err = Config::from_lookup(lookup(&[("RATE_LIMIT_WINDOW", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Zero("RATE_LIMIT_WINDOW")));
    }
}
