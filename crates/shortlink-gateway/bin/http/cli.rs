use clap::{Parser, ValueEnum};
use shortlink_telemetry::LogFormat;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "SHORTLINK_LISTEN_ADDR";
pub const PUBLIC_BASE_URL_ENV: &str = "SHORTLINK_PUBLIC_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "SHORTLINK_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "SHORTLINK_MYSQL_DSN";
pub const DEFAULT_VALIDITY_ENV: &str = "SHORTLINK_DEFAULT_VALIDITY_MINUTES";
pub const CODE_LENGTH_ENV: &str = "SHORTLINK_CODE_LENGTH";
pub const MAX_GENERATION_ATTEMPTS_ENV: &str = "SHORTLINK_MAX_GENERATION_ATTEMPTS";
pub const SWEEP_INTERVAL_ENV: &str = "SHORTLINK_SWEEP_INTERVAL_SECS";
pub const LOG_FORMAT_ENV: &str = "SHORTLINK_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "SHORTLINK_OTLP_ENDPOINT";
pub const AUDIT_ENDPOINT_ENV: &str = "SHORTLINK_AUDIT_ENDPOINT";
pub const AUDIT_TOKEN_ENV: &str = "SHORTLINK_AUDIT_TOKEN";
pub const AUDIT_TIMEOUT_ENV: &str = "SHORTLINK_AUDIT_TIMEOUT_SECS";
pub const AUDIT_QUEUE_CAPACITY_ENV: &str = "SHORTLINK_AUDIT_QUEUE_CAPACITY";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "shortlink-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Prefix used when rendering short links.
    #[arg(long, env = PUBLIC_BASE_URL_ENV, default_value = DEFAULT_PUBLIC_BASE_URL)]
    pub public_base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = DEFAULT_VALIDITY_ENV, default_value_t = 30)]
    pub default_validity_minutes: u32,

    #[arg(
        long,
        env = CODE_LENGTH_ENV,
        default_value_t = shortlink_generator::random::DEFAULT_CODE_LENGTH
    )]
    pub code_length: usize,

    #[arg(
        long,
        env = MAX_GENERATION_ATTEMPTS_ENV,
        default_value_t = shortlink_shortener::DEFAULT_MAX_GENERATION_ATTEMPTS
    )]
    pub max_generation_attempts: u32,

    #[arg(long, env = SWEEP_INTERVAL_ENV, default_value_t = 300)]
    pub sweep_interval_secs: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,

    /// Collector that receives audit events. Audit goes to the local log when unset.
    #[arg(long, env = AUDIT_ENDPOINT_ENV)]
    pub audit_endpoint: Option<String>,

    #[arg(long, env = AUDIT_TOKEN_ENV, hide_env_values = true)]
    pub audit_token: Option<String>,

    #[arg(long, env = AUDIT_TIMEOUT_ENV, default_value_t = 15)]
    pub audit_timeout_secs: u64,

    #[arg(long, env = AUDIT_QUEUE_CAPACITY_ENV, default_value_t = 1024)]
    pub audit_queue_capacity: usize,
}
