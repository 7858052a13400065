use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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

/// Top-level configuration for the floor plan service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub alert_job: AlertJobConfig,
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
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat)?,
            Err(_) if environment == AppEnvironment::Development => LogFormat::Pretty,
            Err(_) => LogFormat::Compact,
        };

        let interval_secs = env::var("ALERT_JOB_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_ALERT_INTERVAL_SECS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidInterval)?;
        let enabled = flag("ALERT_JOB_ENABLED", true)?;
        let accrue_interest = flag("INTEREST_ACCRUAL_ENABLED", true)?;
        let secret = env::var("ALERT_JOB_SECRET")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            alert_job: AlertJobConfig {
                enabled,
                interval: Duration::from_secs(interval_secs),
                secret,
                accrue_interest,
            },
        })
    }
}

pub const DEFAULT_ALERT_INTERVAL_SECS: u64 = 900;

fn flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name }),
        },
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Line layout of the log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored output for local runs.
    Pretty,
    /// Single-line output for collectors.
    Compact,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Background accrual and alert cycle, plus its external trigger.
#[derive(Debug, Clone)]
pub struct AlertJobConfig {
    pub enabled: bool,
    pub interval: Duration,
    /// Bearer token required by the trigger endpoint; the trigger is refused when unset.
    pub secret: Option<String>,
    pub accrue_interest: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidInterval,
    InvalidFlag { name: &'static str },
    InvalidLogFormat,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidInterval => {
                write!(f, "ALERT_JOB_INTERVAL_SECS must be a positive integer")
            }
            ConfigError::InvalidFlag { name } => write!(f, "{name} must be true or false"),
            ConfigError::InvalidLogFormat => write!(f, "APP_LOG_FORMAT must be pretty or compact"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidInterval
            | ConfigError::InvalidFlag { .. }
            | ConfigError::InvalidLogFormat => None,
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
            "APP_LOG_FORMAT",
            "ALERT_JOB_INTERVAL_SECS",
            "ALERT_JOB_ENABLED",
            "ALERT_JOB_SECRET",
            "INTEREST_ACCRUAL_ENABLED",
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
        assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
        assert!(config.alert_job.enabled);
        assert!(config.alert_job.accrue_interest);
        assert_eq!(config.alert_job.interval, Duration::from_secs(900));
        assert_eq!(config.alert_job.secret, None);
    }

    #[test]
    fn production_logs_default_to_compact_lines() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        reset_env();
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
    fn reads_alert_job_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ALERT_JOB_INTERVAL_SECS", "60");
        env::set_var("ALERT_JOB_ENABLED", "false");
        env::set_var("ALERT_JOB_SECRET", "  trigger-token ");
        env::set_var("INTEREST_ACCRUAL_ENABLED", "0");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.alert_job.interval, Duration::from_secs(60));
        assert!(!config.alert_job.enabled);
        assert!(!config.alert_job.accrue_interest);
        assert_eq!(config.alert_job.secret.as_deref(), Some("trigger-token"));
        reset_env();
    }

    #[test]
    fn rejects_malformed_job_and_log_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ALERT_JOB_INTERVAL_SECS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidInterval)
        ));

        reset_env();
        env::set_var("APP_LOG_FORMAT", "json");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidLogFormat)
        ));

        reset_env();
        env::set_var("ALERT_JOB_ENABLED", "sometimes");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFlag {
                name: "ALERT_JOB_ENABLED"
            })
        ));
        reset_env();
    }
}
