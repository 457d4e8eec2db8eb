use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Failures while bootstrapping or operating the runtime around a provider.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("migration ledger unavailable: {0}")]
    Ledger(#[source] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] MigrateError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }

    /// Whether retrying against the same database could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            InfraError::Connect(err) | InfraError::Ledger(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }
}
