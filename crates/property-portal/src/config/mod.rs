use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub verification: VerificationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            verification: VerificationConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Listing bounds and optional data files for the verification workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub seed_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            seed_path: None,
            catalog_path: None,
        }
    }
}

impl VerificationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_page_size = page_size_var("APP_DEFAULT_PAGE_SIZE", defaults.default_page_size)?;
        let max_page_size = page_size_var("APP_MAX_PAGE_SIZE", defaults.max_page_size)?;
        if default_page_size > max_page_size {
            return Err(ConfigError::PageSizeBounds {
                default: default_page_size,
                max: max_page_size,
            });
        }

        Ok(Self {
            default_page_size,
            max_page_size,
            seed_path: path_var("APP_SEED_PATH"),
            catalog_path: path_var("APP_CATALOG_PATH"),
        })
    }
}

fn page_size_var(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidPageSize { name }),
        },
        Err(_) => Ok(default),
    }
}

fn path_var(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPageSize { name: &'static str },
    PageSizeBounds { default: usize, max: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPageSize { name } => {
                write!(f, "{name} must be a positive integer")
            }
            ConfigError::PageSizeBounds { default, max } => write!(
                f,
                "APP_DEFAULT_PAGE_SIZE ({default}) must not exceed APP_MAX_PAGE_SIZE ({max})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidPageSize { .. }
            | ConfigError::PageSizeBounds { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_DEFAULT_PAGE_SIZE",
            "APP_MAX_PAGE_SIZE",
            "APP_SEED_PATH",
            "APP_CATALOG_PATH",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.verification, VerificationConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_verification_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DEFAULT_PAGE_SIZE", "10");
        env::set_var("APP_MAX_PAGE_SIZE", "50");
        env::set_var("APP_SEED_PATH", "data/applicants.json");
        env::set_var("APP_CATALOG_PATH", "  ");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.verification.default_page_size, 10);
        assert_eq!(config.verification.max_page_size, 50);
        assert_eq!(
            config.verification.seed_path,
            Some(PathBuf::from("data/applicants.json"))
        );
        assert_eq!(config.verification.catalog_path, None);
        reset_env();
    }

    #[test]
    fn rejects_zero_page_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MAX_PAGE_SIZE", "0");
        let err = AppConfig::load().expect_err("zero page size is rejected");
        assert!(matches!(
            err,
            ConfigError::InvalidPageSize {
                name: "APP_MAX_PAGE_SIZE"
            }
        ));
        reset_env();
    }

    #[test]
    fn rejects_default_above_max() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DEFAULT_PAGE_SIZE", "200");
        let err = AppConfig::load().expect_err("default above max is rejected");
        assert!(matches!(
            err,
            ConfigError::PageSizeBounds {
                default: 200,
                max: 100
            }
        ));
        reset_env();
    }
}
