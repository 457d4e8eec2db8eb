//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;
#[cfg(test)]
mod tests;

pub use cli::{
    BackendArg, CliArgs, Command, DatabaseOverride, MigrationsArgs, MigrationsCommand,
    MigrationsRevertArgs, MigrationsRunArgs, ServeArgs, ServeOverrides,
};

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::queries::QueryConfig;
use crate::application::tags::DEFAULT_TAG_PAGE_SIZE;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quire";
const ENV_PREFIX: &str = "QUIRE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_API_BASE_PATH: &str = "/api/blog";
const DEFAULT_QUERY_CACHE_CAPACITY: usize = 256;
const DEFAULT_QUERY_STALE_SECS: u64 = 60;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub provider: ProviderSettings,
    pub api: ApiSettings,
    pub queries: QueryConfig,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    pub migrate_on_start: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderBackend {
    Memory,
    Postgres,
}

impl FromStr for ProviderBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(ProviderBackend::Memory),
            "postgres" | "postgresql" => Ok(ProviderBackend::Postgres),
            other => Err(format!("unknown backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub backend: ProviderBackend,
    pub seed: bool,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_path: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrations(args)) => {
            raw.apply_database_override(args.command.database());
            raw.provider.backend = Some(BackendArg::Postgres.as_str().to_string());
        }
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    provider: RawProviderSettings,
    api: RawApiSettings,
    queries: RawQuerySettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(migrate) = overrides.database_migrate_on_start {
            self.database.migrate_on_start = Some(migrate);
        }
        if let Some(backend) = overrides.provider_backend {
            self.provider.backend = Some(backend.as_str().to_string());
        }
        if let Some(seed) = overrides.provider_seed {
            self.provider.seed = Some(seed);
        }
        if let Some(base_path) = overrides.api_base_path.as_ref() {
            self.api.base_path = Some(base_path.clone());
        }
        if let Some(capacity) = overrides.queries_cache_capacity {
            self.queries.cache_capacity = Some(capacity);
        }
        if let Some(seconds) = overrides.queries_stale_seconds {
            self.queries.stale_seconds = Some(seconds);
        }
        if let Some(size) = overrides.queries_tag_page_size {
            self.queries.tag_page_size = Some(size);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            provider,
            api,
            queries,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let database = build_database_settings(database)?;
        let provider = build_provider_settings(provider, &database)?;
        let api = build_api_settings(api)?;
        let queries = build_query_settings(queries)?;

        Ok(Self {
            server,
            logging,
            database,
            provider,
            api,
            queries,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;
    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };
    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;
    Ok(DatabaseSettings {
        url,
        max_connections,
        migrate_on_start: database.migrate_on_start.unwrap_or(true),
    })
}

fn build_provider_settings(
    provider: RawProviderSettings,
    database: &DatabaseSettings,
) -> Result<ProviderSettings, LoadError> {
    let backend = match provider.backend {
        Some(value) => ProviderBackend::from_str(&value)
            .map_err(|reason| LoadError::invalid("provider.backend", reason))?,
        None => ProviderBackend::Memory,
    };
    if backend == ProviderBackend::Postgres && database.url.is_none() {
        return Err(LoadError::invalid(
            "database.url",
            "the postgres backend requires a database URL",
        ));
    }
    Ok(ProviderSettings {
        backend,
        seed: provider.seed.unwrap_or(false),
    })
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let base_path = api
        .base_path
        .unwrap_or_else(|| DEFAULT_API_BASE_PATH.to_string());
    if !base_path.starts_with('/') {
        return Err(LoadError::invalid(
            "api.base_path",
            "path must start with `/`",
        ));
    }
    let trimmed = base_path.trim_end_matches('/');
    let base_path = if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    };
    Ok(ApiSettings { base_path })
}

fn build_query_settings(queries: RawQuerySettings) -> Result<QueryConfig, LoadError> {
    let capacity = NonZeroUsize::new(
        queries
            .cache_capacity
            .unwrap_or(DEFAULT_QUERY_CACHE_CAPACITY),
    )
    .ok_or_else(|| LoadError::invalid("queries.cache_capacity", "must be greater than zero"))?;
    let stale_seconds = queries.stale_seconds.unwrap_or(DEFAULT_QUERY_STALE_SECS);
    let tag_page_size = non_zero_u32(
        queries
            .tag_page_size
            .unwrap_or(DEFAULT_TAG_PAGE_SIZE)
            .into(),
        "queries.tag_page_size",
    )?;
    Ok(QueryConfig {
        capacity,
        stale_after: Duration::from_secs(stale_seconds),
        tag_page_size: tag_page_size.get(),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    migrate_on_start: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawProviderSettings {
    backend: Option<String>,
    seed: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawQuerySettings {
    cache_capacity: Option<usize>,
    stale_seconds: Option<u64>,
    tag_page_size: Option<u32>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
