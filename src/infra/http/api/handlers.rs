//! Blog API handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::application::provider::{CreatePostInput, PostFilter, PostLookup, UpdatePostInput};

use super::error::{ApiError, provider_to_api};
use super::extract::{ApiJson, ApiQuery};
use super::state::ApiState;

pub async fn list_posts(
    State(state): State<ApiState>,
    ApiQuery(filter): ApiQuery<PostFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.queries.posts(&filter).await.map_err(provider_to_api)?;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    ApiQuery(lookup): ApiQuery<PostLookup>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .queries
        .post(&slug, &lookup)
        .await
        .map_err(provider_to_api)?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(ApiError::not_found("post not found")),
    }
}

pub async fn create_post(
    State(state): State<ApiState>,
    ApiJson(input): ApiJson<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .queries
        .create_post(input)
        .await
        .map_err(provider_to_api)?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
    ApiJson(input): ApiJson<UpdatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .queries
        .update_post(&slug, input)
        .await
        .map_err(provider_to_api)?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .queries
        .delete_post(&slug)
        .await
        .map_err(provider_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tags(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let tags = state.queries.tags().await.map_err(provider_to_api)?;
    Ok(Json(tags))
}

pub async fn db_health(State(state): State<ApiState>) -> Response {
    let Some(db) = state.db.as_ref() else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
