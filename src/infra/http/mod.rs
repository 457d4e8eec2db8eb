//! HTTP surface: the JSON blog API and its shared middleware.

pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};
