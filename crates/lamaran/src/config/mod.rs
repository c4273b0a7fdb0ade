use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;

/// Append range used when `GOOGLE_SHEETS_RANGE` is not set.
pub const DEFAULT_SHEETS_RANGE: &str = "DataRekapPelamar!A:F";

/// Hard cap applied to the uploaded CV while it streams to disk.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Asia/Jakarta (UTC+7, no daylight saving).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 7 * 60;

pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

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
    pub intake: IntakeConfig,
    pub commit: CommitConfig,
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
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        let scratch_dir = env::var("INTAKE_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("lamaran-uploads"));
        let max_file_bytes = parse_var("INTAKE_MAX_FILE_BYTES", DEFAULT_MAX_FILE_BYTES)?;
        let require_pdf = parse_flag("INTAKE_REQUIRE_PDF")?;

        let offset_minutes =
            parse_var("SUBMISSION_UTC_OFFSET_MINUTES", DEFAULT_UTC_OFFSET_MINUTES)?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or(ConfigError::InvalidValue("SUBMISSION_UTC_OFFSET_MINUTES"))?;
        let timeout_secs = parse_var("GOOGLE_REQUEST_TIMEOUT_SECS", DEFAULT_REMOTE_TIMEOUT_SECS)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            intake: IntakeConfig {
                scratch_dir,
                max_file_bytes,
                require_pdf,
            },
            commit: CommitConfig {
                utc_offset,
                remote_timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &'static str) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::InvalidValue(name)),
        },
        Err(_) => Ok(false),
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Where and how uploaded CVs are staged before the remote upload.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub scratch_dir: PathBuf,
    pub max_file_bytes: u64,
    pub require_pdf: bool,
}

/// Settings for the upload-then-record step.
#[derive(Debug, Clone)]
pub struct CommitConfig {
    pub utc_offset: FixedOffset,
    pub remote_timeout: Duration,
}

/// Service account and target identifiers for Drive and Sheets.
#[derive(Clone)]
pub struct GoogleConfig {
    pub service_account_email: String,
    pub private_key: String,
    pub drive_folder_id: String,
    pub spreadsheet_id: String,
    pub sheets_range: String,
}

impl GoogleConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let service_account_email = required_var("GOOGLE_SERVICE_ACCOUNT_EMAIL")?;
        let private_key = normalize_private_key(&required_var("GOOGLE_PRIVATE_KEY")?);
        let drive_folder_id = required_var("GOOGLE_DRIVE_FOLDER_ID")?;
        let spreadsheet_id = required_var("GOOGLE_SHEETS_ID")?;
        let sheets_range = env::var("GOOGLE_SHEETS_RANGE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SHEETS_RANGE.to_string());

        Ok(Self {
            service_account_email,
            private_key,
            drive_folder_id,
            spreadsheet_id,
            sheets_range,
        })
    }
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("service_account_email", &self.service_account_email)
            .field("private_key", &"<redacted>")
            .field("drive_folder_id", &self.drive_folder_id)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("sheets_range", &self.sheets_range)
            .finish()
    }
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

/// Keys pasted into a single-line env var carry literal `\n` sequences.
pub fn normalize_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue(&'static str),
    MissingVar(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue(name) => write!(f, "{name} has an invalid value"),
            ConfigError::MissingVar(name) => write!(f, "{name} must be set"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue(_)
            | ConfigError::MissingVar(_) => None,
        }
    }
}
