pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

pub use state::ApiState;

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::infra::http::middleware::{log_responses, set_request_context};

/// Build the blog API with every route mounted under `base_path`.
pub fn build_api_router(state: ApiState, base_path: &str) -> Router {
    let blog: Router<ApiState> = Router::new()
        .route(
            "/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/posts/{slug}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/tags", get(handlers::list_tags));

    let base_path = base_path.trim_end_matches('/');
    let router = Router::new().route("/_health/db", get(handlers::db_health));
    let router = if base_path.is_empty() {
        router.merge(blog)
    } else {
        router.nest(base_path, blog)
    };

    router
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
