use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{application::provider::ProviderError, infra::error::InfraError};

/// Diagnostic chain attached to error responses and read back by the
/// response-logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut next = error.source();
        while let Some(inner) = next {
            messages.push(inner.to_string());
            next = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status: 78 (`EX_CONFIG`) for bad configuration, 69
    /// (`EX_UNAVAILABLE`) when the database cannot be reached, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Infra(InfraError::Configuration { .. }) => 78,
            AppError::Infra(InfraError::Connect(_))
            | AppError::Provider(ProviderError::Connection(_) | ProviderError::Timeout) => 69,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("could not load posts")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn report_walks_the_source_chain() {
        let err = Outer(std::io::Error::other("disk on fire"));
        let report = ErrorReport::from_error("tests", StatusCode::INTERNAL_SERVER_ERROR, &err);
        assert_eq!(
            report.messages,
            vec!["could not load posts".to_string(), "disk on fire".to_string()]
        );
    }

    #[test]
    fn exit_codes_follow_failure_category() {
        assert_eq!(AppError::config("bad port").exit_code(), 78);
        assert_eq!(
            AppError::from(InfraError::configuration("no url")).exit_code(),
            78
        );
        assert_eq!(AppError::from(ProviderError::Timeout).exit_code(), 69);
        assert_eq!(
            AppError::from(ProviderError::validation("x")).exit_code(),
            1
        );
    }
}
