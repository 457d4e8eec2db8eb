use crate::application::provider::ProviderError;

pub fn map_sqlx_error(err: sqlx::Error) -> ProviderError {
    match err {
        sqlx::Error::PoolTimedOut => ProviderError::Timeout,
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => ProviderError::Connection(err.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => ProviderError::Persistence(
            format!(
                "duplicate value violates `{}`",
                db.constraint().unwrap_or("unknown")
            ),
        ),
        sqlx::Error::Database(db)
            if db.is_foreign_key_violation()
                || db.message().contains("invalid input syntax") =>
        {
            ProviderError::validation(db.message())
        }
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request")
                || db.message().contains("statement timeout") =>
        {
            ProviderError::Timeout
        }
        other => ProviderError::from_persistence(other),
    }
}

/// Like [`map_sqlx_error`], but a unique violation on a post write means the
/// slug is taken.
pub fn map_post_write_error(err: sqlx::Error, slug: &str) -> ProviderError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => ProviderError::conflict(slug),
        _ => map_sqlx_error(err),
    }
}
