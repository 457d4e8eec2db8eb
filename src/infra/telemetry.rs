//! Tracing subscriber and metric descriptions for the service process.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    filter::LevelFilter,
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

/// Directives applied when `RUST_LOG` is unset; sqlx logs every statement at info.
const QUIET_DEPENDENCIES: &str = "sqlx::query=warn,hyper=warn";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global subscriber. `RUST_LOG`, when set, takes precedence
/// over `logging.level` and the dependency directives.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(logging.level, rust_log.as_deref())?;

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })?;

    info!(
        target = "quire::telemetry",
        level = %logging.level,
        format = logging.format.as_str(),
        "logging initialised"
    );
    Ok(())
}

fn build_filter(level: LevelFilter, rust_log: Option<&str>) -> Result<EnvFilter, InfraError> {
    let builder = EnvFilter::builder().with_default_directive(level.into());
    match rust_log.map(str::trim).filter(|directives| !directives.is_empty()) {
        Some(directives) => Ok(builder.parse_lossy(directives)),
        None => builder
            .parse(QUIET_DEPENDENCIES)
            .map(|filter| filter.add_directive(level.into()))
            .map_err(|err| InfraError::telemetry(format!("invalid log directives: {err}"))),
    }
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "quire_query_cache_hit_total",
            Unit::Count,
            "Query cache lookups answered from a fresh entry."
        );
        describe_counter!(
            "quire_query_cache_miss_total",
            Unit::Count,
            "Query cache lookups that went to the provider, stale entries included."
        );
        describe_counter!(
            "quire_query_cache_evict_total",
            Unit::Count,
            "Entries pushed out of the query cache by capacity."
        );
        describe_counter!(
            "quire_query_cache_invalidate_total",
            Unit::Count,
            "Entries dropped from the query cache after a post mutation."
        );
        describe_histogram!(
            "quire_tag_aggregation_ms",
            Unit::Milliseconds,
            "Time spent paging through posts to build the tag list."
        );
    });
}
