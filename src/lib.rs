//! Blog content service: pluggable post providers, a cached query layer,
//! tag aggregation, route resolution and a JSON API.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub(crate) mod util;
