use crate::application::error::ErrorReport;
use crate::application::provider::ProviderError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const DB_UNAVAILABLE: &str = "db_unavailable";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const PROVIDER: &str = "provider_error";
    pub const READ_ONLY: &str = "read_only";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}

/// Map a provider failure onto the API's status codes and error codes.
pub(crate) fn provider_to_api(err: ProviderError) -> ApiError {
    match err {
        ProviderError::NotFound { slug } => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Post not found",
            Some(format!("no post has slug `{slug}`")),
        ),
        ProviderError::Conflict { slug } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Slug already in use",
            Some(slug),
        ),
        ProviderError::Validation { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        ProviderError::Connection(message) => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_UNAVAILABLE,
            "Database unavailable",
            Some(message),
        ),
        ProviderError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        ProviderError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::PROVIDER,
            "Persistence error",
            Some(message),
        ),
        ProviderError::Unsupported { operation } => ApiError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            codes::READ_ONLY,
            "Backend is read-only",
            Some(operation.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_to_statuses() {
        let cases = [
            (ProviderError::not_found("x"), StatusCode::NOT_FOUND),
            (ProviderError::conflict("x"), StatusCode::CONFLICT),
            (ProviderError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                ProviderError::Connection("refused".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ProviderError::Timeout, StatusCode::SERVICE_UNAVAILABLE),
            (
                ProviderError::from_persistence("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ProviderError::unsupported("create_post"),
                StatusCode::METHOD_NOT_ALLOWED,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(provider_to_api(err).status(), expected);
        }
    }

    #[test]
    fn error_body_omits_missing_hint() {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: codes::NOT_FOUND.to_string(),
                message: "Post not found".to_string(),
                hint: None,
            },
        };
        insta::assert_snapshot!(
            serde_json::to_string(&body).expect("serialize"),
            @r#"{"error":{"code":"not_found","message":"Post not found"}}"#
        );
    }
}
