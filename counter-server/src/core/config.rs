use crate::auth::JwtConfig;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | HTTP_PORT | 3000 | HTTP service port |
/// | BIND_ADDR | 0.0.0.0 | Bind address |
/// | ENVIRONMENT | development | Run environment |
/// | LOG_LEVEL | info | Log level when RUST_LOG is unset |
/// | LOG_JSON | false | JSON log output |
/// | LOG_DIR | (unset) | Daily-rotated log file directory |
/// | FANOUT_QUEUE_CAPACITY | 64 | Per-connection event queue size |
/// | NOTIFICATION_BUFFER_SIZE | 50 | Recent-notification ring size |
/// | SUBMIT_TIMEOUT_MS | 5000 | Advisory submit timeout echoed to clients |
/// | JWT_SECRET / JWT_ISSUER / JWT_AUDIENCE | see auth | Token verification |
///
/// # Example
///
/// ```ignore
/// HTTP_PORT=8080 LOG_JSON=true cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the HTTP listener
    pub bind_addr: String,
    /// HTTP API service port
    pub http_port: u16,
    /// JWT verification configuration
    pub jwt: JwtConfig,
    /// Run environment: development | staging | production
    pub environment: String,
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON-formatted logs
    pub log_json: bool,
    /// Directory for daily-rotated log files, stdout when unset
    pub log_dir: Option<String>,
    /// Bounded per-connection fan-out queue capacity
    pub fanout_queue_capacity: usize,
    /// Recent-notification ring buffer capacity
    pub notification_buffer_size: usize,
    /// Advisory submission timeout surfaced to clients (milliseconds)
    pub submit_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok(),
            fanout_queue_capacity: std::env::var("FANOUT_QUEUE_CAPACITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(64),
            notification_buffer_size: std::env::var("NOTIFICATION_BUFFER_SIZE")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(50),
            submit_timeout_ms: std::env::var("SUBMIT_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
        }
    }

    /// Override the listener settings, commonly used by tests
    pub fn with_overrides(http_port: u16, jwt_secret: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.http_port = http_port;
        config.jwt.secret = jwt_secret.into();
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        let config = Config::from_env();
        assert!(config.fanout_queue_capacity > 0);
        assert!(config.notification_buffer_size > 0);
        assert_eq!(config.submit_timeout_ms, 5000);
    }

    #[test]
    fn overrides_replace_listener_settings() {
        let config = Config::with_overrides(18080, "override-secret-that-is-long-enough00");
        assert_eq!(config.http_port, 18080);
        assert_eq!(config.jwt.secret, "override-secret-that-is-long-enough00");
    }
}
