//! Server configuration, loadable from the environment.

use std::env;

/// Runtime settings for [`App`](crate::App).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Stack size for request coroutines, bytes.
    pub stack_size: usize,
    /// Emit one `info` line per completed request.
    pub log_requests: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 8000,
            stack_size: 0x10000,
            log_requests: true,
        }
    }
}

impl Config {
    /// Load from `TRELLIS_HOST`, `TRELLIS_PORT`, `TRELLIS_STACK_SIZE`
    /// (decimal or `0x`-hex) and `TRELLIS_DISABLE_REQUEST_LOG`. Unset or
    /// unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        if let Ok(host) = env::var("TRELLIS_HOST") {
            if !host.is_empty() {
                config.host = host;
            }
        }
        if let Ok(port) = env::var("TRELLIS_PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        if let Ok(size) = env::var("TRELLIS_STACK_SIZE") {
            let parsed = match size.strip_prefix("0x") {
                Some(hex) => usize::from_str_radix(hex, 16).ok(),
                None => size.parse().ok(),
            };
            if let Some(size) = parsed {
                config.stack_size = size;
            }
        }
        if env::var("TRELLIS_DISABLE_REQUEST_LOG").is_ok() {
            config.log_requests = false;
        }
        config
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
