use clap::{Parser, Subcommand, ValueEnum};
use jiff::Timestamp;
use std::fmt::{Display, Formatter};

pub const MACHINE_ID_ENV: &str = "SNAPLINK_MACHINE_ID";
pub const EPOCH_ENV: &str = "SNAPLINK_EPOCH";
pub const STORAGE_BACKEND_ENV: &str = "SNAPLINK_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "SNAPLINK_MYSQL_DSN";
pub const CACHE_BACKEND_ENV: &str = "SNAPLINK_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "SNAPLINK_REDIS_URL";
pub const REDIS_KEY_PREFIX_ENV: &str = "SNAPLINK_REDIS_KEY_PREFIX";
pub const CACHE_CAPACITY_ENV: &str = "SNAPLINK_CACHE_CAPACITY";
pub const CACHE_TTL_SECS_ENV: &str = "SNAPLINK_CACHE_TTL_SECS";
pub const OPERATION_TIMEOUT_MS_ENV: &str = "SNAPLINK_OPERATION_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "SNAPLINK_LOG_FORMAT";

pub const DEFAULT_MACHINE_ID: &str = "1";
pub const DEFAULT_EPOCH: &str = "2021-09-01T00:00:00Z";
pub const DEFAULT_CACHE_CAPACITY: &str = "10000";
pub const DEFAULT_CACHE_TTL_SECS: &str = "3600";

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
pub enum CacheBackendArg {
    #[value(name = "moka")]
    Moka,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::Moka => write!(f, "moka"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shorten one or more URLs.
    Shorten {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Print the long URL behind each short code.
    Resolve {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Delete the links stored under the given short codes.
    Delete {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Print the number of stored links.
    Count,
}

#[derive(Debug, Parser)]
#[command(name = "snaplink", version, about = "Shorten and resolve URLs")]
pub struct CLI {
    /// Machine id embedded in generated ids (0-1023).
    #[arg(
        long,
        env = MACHINE_ID_ENV,
        default_value = DEFAULT_MACHINE_ID,
        value_parser = clap::value_parser!(u16).range(0..=1023),
    )]
    pub machine_id: u16,

    /// Custom epoch of generated ids, RFC 3339.
    #[arg(long, env = EPOCH_ENV, default_value = DEFAULT_EPOCH)]
    pub epoch: Timestamp,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::Moka
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    #[arg(
        long,
        env = REDIS_KEY_PREFIX_ENV,
        default_value = snaplink_cache::redis::DEFAULT_KEY_PREFIX
    )]
    pub redis_key_prefix: String,

    #[arg(long, env = CACHE_CAPACITY_ENV, default_value = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: u64,

    /// How long resolved links stay cached.
    #[arg(
        long,
        env = CACHE_TTL_SECS_ENV,
        default_value = DEFAULT_CACHE_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    pub cache_ttl_secs: u64,

    /// Deadline for each storage and cache call.
    #[arg(long, env = OPERATION_TIMEOUT_MS_ENV)]
    pub operation_timeout_ms: Option<u64>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}
