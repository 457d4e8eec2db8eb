use std::{process, sync::Arc};

use quire::{
    application::{error::AppError, queries::BlogQueries},
    config::{self, ProviderBackend},
    infra::{
        db::{Migrations, PostgresProvider},
        error::InfraError,
        http::{self, ApiState},
        memory::MemoryProvider,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let retryable = matches!(error, AppError::Infra(infra) if infra.is_transient());
    if dispatcher::has_been_set() {
        error!(error = %error, retryable, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, retryable, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::config(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrations(args) => run_migrations(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = match settings.provider.backend {
        ProviderBackend::Memory => {
            let provider = if settings.provider.seed {
                MemoryProvider::seeded()?
            } else {
                MemoryProvider::new()
            };
            info!(
                target = "quire::serve",
                backend = "memory",
                posts = provider.len(),
                "provider ready"
            );
            ApiState::new(BlogQueries::for_provider(
                Arc::new(provider),
                settings.queries.clone(),
            ))
        }
        ProviderBackend::Postgres => {
            let provider = Arc::new(connect_postgres(&settings).await?);
            if settings.database.migrate_on_start {
                Migrations::new(provider.pool().clone()).run().await?;
            }
            if settings.provider.seed {
                warn!(
                    target = "quire::serve",
                    "seeding is only supported by the memory backend"
                );
            }
            info!(target = "quire::serve", backend = "postgres", "provider ready");
            ApiState::new(BlogQueries::for_provider(
                provider.clone(),
                settings.queries.clone(),
            ))
            .with_database(provider)
        }
    };

    serve_http(&settings, state).await
}

async fn run_migrations(
    settings: config::Settings,
    args: config::MigrationsArgs,
) -> Result<(), AppError> {
    let provider = connect_postgres(&settings).await?;
    let migrations = Migrations::new(provider.pool().clone());

    match args.command {
        config::MigrationsCommand::Run(_) => {
            let applied = migrations.run().await?;
            info!(
                target = "quire::migrations",
                applied = applied.len(),
                "migration run finished"
            );
        }
        config::MigrationsCommand::Revert(cmd) => {
            let reverted = migrations.revert(cmd.target).await?;
            info!(
                target = "quire::migrations",
                reverted = reverted.len(),
                "migration revert finished"
            );
        }
        config::MigrationsCommand::Status(_) => {
            for status in migrations.status().await? {
                info!(
                    target = "quire::migrations",
                    version = status.version,
                    description = %status.description,
                    state = status.state.as_str(),
                    "migration"
                );
            }
        }
    }

    Ok(())
}

async fn connect_postgres(settings: &config::Settings) -> Result<PostgresProvider, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresProvider::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::Connect)?;

    Ok(PostgresProvider::new(pool))
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_api_router(state, &settings.api.base_path);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "quire::serve",
        addr = %settings.server.addr,
        base_path = %settings.api.base_path,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target = "quire::serve", error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "quire::serve", "shutting down");
}
