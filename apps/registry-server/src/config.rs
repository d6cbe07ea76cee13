//! Centralized configuration for registry-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time. The `--addr` command line
//! flag takes precedence over `HTTP_ADDR`.

use axum::http::HeaderValue;
use std::env;
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

/// Listen on all interfaces, port 8080.
pub const DEFAULT_ADDR: &str = ":8080";

/// Index file served at `/` unless `INDEX_PATH` says otherwise.
pub const DEFAULT_INDEX_PATH: &str = "index.html";

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from the command line and environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Resolved listen address (default: all interfaces, port 8080)
    pub addr: SocketAddr,
    /// File served at the root path
    pub index_path: PathBuf,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Log format
    pub log_format: LogFormat,
    /// Request body limit for the write endpoints; `None` means unlimited
    pub max_body_bytes: Option<usize>,
}

impl Config {
    /// Load and validate configuration from environment variables, letting
    /// `addr_override` (the `--addr` flag) win over `HTTP_ADDR`.
    pub fn from_env(addr_override: Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(addr_override, |key| env::var(key).ok())
    }

    fn from_lookup<F>(addr_override: Option<String>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Listen address
        let addr_str = addr_override
            .or_else(|| lookup("HTTP_ADDR"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ADDR.into());
        let addr = parse_listen_addr(&addr_str)?;

        // Index file
        let index_path = lookup("INDEX_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH));

        // CORS allow origin
        let cors_origin_str = lookup("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        // Log format
        let log_format =
            LogFormat::from_str(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        // Body limit
        let max_body_bytes = match lookup("MAX_BODY_BYTES").filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(ConfigError {
                        field: "MAX_BODY_BYTES",
                        message: format!("Expected a positive integer, got '{}'", raw),
                    })
                }
            },
        };

        Ok(Self {
            addr,
            index_path,
            cors_allow_origin,
            log_format,
            max_body_bytes,
        })
    }

    /// Log warnings about permissive configuration.
    pub fn warn_if_permissive(&self) {
        if self.max_body_bytes.is_none() {
            tracing::warn!(
                "MAX_BODY_BYTES not set: request bodies on the add endpoints are unbounded."
            );
        }
    }
}

/// Parse a `host:port` listen address. A bare `:port` binds all interfaces.
pub fn parse_listen_addr(s: &str) -> Result<SocketAddr, ConfigError> {
    let full = if s.starts_with(':') {
        format!("0.0.0.0{}", s)
    } else {
        s.to_string()
    };
    let mut addrs = full.to_socket_addrs().map_err(|e| ConfigError {
        field: "HTTP_ADDR",
        message: format!("Invalid listen address '{}': {}", s, e),
    })?;
    addrs.next().ok_or_else(|| ConfigError {
        field: "HTTP_ADDR",
        message: format!("Listen address '{}' resolved to nothing", s),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(addr_override: Option<&str>, vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(addr_override.map(String::from), |k| map.get(k).cloned())
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::from_str("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("anything"), LogFormat::Pretty);
    }

    #[test]
    fn listen_addr_parsing() {
        assert_eq!(
            parse_listen_addr(":8080").unwrap(),
            "0.0.0.0:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_listen_addr("127.0.0.1:3000").unwrap(),
            "127.0.0.1:3000".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_listen_addr("no-port").is_err());
        assert!(parse_listen_addr("127.0.0.1:99999").is_err());
    }

    #[test]
    fn defaults() {
        let cfg = load(None, &[]).unwrap();
        assert_eq!(cfg.addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.index_path, PathBuf::from("index.html"));
        assert_eq!(cfg.cors_allow_origin, HeaderValue::from_static("*"));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.max_body_bytes, None);
    }

    #[test]
    fn flag_overrides_env_addr() {
        let cfg = load(Some("127.0.0.1:9000"), &[("HTTP_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(cfg.addr.port(), 9000);

        let cfg = load(None, &[("HTTP_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(cfg.addr.port(), 7000);
    }

    #[test]
    fn invalid_addr_is_reported() {
        let err = load(Some("bogus"), &[]).unwrap_err();
        assert_eq!(err.field, "HTTP_ADDR");
    }

    #[test]
    fn body_limit_parsing() {
        let cfg = load(None, &[("MAX_BODY_BYTES", "4096")]).unwrap();
        assert_eq!(cfg.max_body_bytes, Some(4096));

        assert_eq!(load(None, &[("MAX_BODY_BYTES", "0")]).unwrap_err().field, "MAX_BODY_BYTES");
        assert_eq!(load(None, &[("MAX_BODY_BYTES", "lots")]).unwrap_err().field, "MAX_BODY_BYTES");
    }

    #[test]
    fn bad_cors_origin_is_reported() {
        let err = load(None, &[("CORS_ALLOW_ORIGIN", "bad\norigin")]).unwrap_err();
        assert_eq!(err.field, "CORS_ALLOW_ORIGIN");
    }
}
