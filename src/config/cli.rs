use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, builder::BoolishValueParser};

/// Command-line arguments for the Quire binary.
#[derive(Debug, Parser)]
#[command(name = "quire", version, about = "Quire blog content service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "QUIRE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the blog HTTP API.
    Serve(Box<ServeArgs>),
    /// Schema migration utilities.
    #[command(name = "migrations")]
    Migrations(MigrationsArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Memory,
    Postgres,
}

impl BackendArg {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendArg::Memory => "memory",
            BackendArg::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Apply pending migrations before serving.
    #[arg(
        long = "database-migrate-on-start",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub database_migrate_on_start: Option<bool>,

    /// Select the storage backend.
    #[arg(long = "provider-backend", value_name = "BACKEND")]
    pub provider_backend: Option<BackendArg>,

    /// Populate the memory backend with demo content.
    #[arg(
        long = "provider-seed",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub provider_seed: Option<bool>,

    /// Override the path the API is mounted under.
    #[arg(long = "api-base-path", value_name = "PATH")]
    pub api_base_path: Option<String>,

    /// Override the number of cached query results.
    #[arg(long = "queries-cache-capacity", value_name = "COUNT")]
    pub queries_cache_capacity: Option<usize>,

    /// Override how long cached query results stay fresh.
    #[arg(long = "queries-stale-seconds", value_name = "SECONDS")]
    pub queries_stale_seconds: Option<u64>,

    /// Override the page size used while aggregating tags.
    #[arg(long = "queries-tag-page-size", value_name = "COUNT")]
    pub queries_tag_page_size: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct MigrationsArgs {
    #[command(subcommand)]
    pub command: MigrationsCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum MigrationsCommand {
    /// Apply every pending migration.
    #[command(name = "run")]
    Run(MigrationsRunArgs),
    /// Undo applied migrations down to a target version.
    #[command(name = "revert")]
    Revert(MigrationsRevertArgs),
    /// List applied and pending migrations.
    #[command(name = "status")]
    Status(MigrationsRunArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrationsRunArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrationsRevertArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Version to revert down to; only the latest migration is undone when omitted.
    #[arg(long = "target", value_name = "VERSION")]
    pub target: Option<i64>,
}

impl MigrationsCommand {
    pub fn database(&self) -> &DatabaseOverride {
        match self {
            MigrationsCommand::Run(args) | MigrationsCommand::Status(args) => &args.database,
            MigrationsCommand::Revert(args) => &args.database,
        }
    }
}
