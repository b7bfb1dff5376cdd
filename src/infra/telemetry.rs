use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

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
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_gauge!(
            "mdconvert_artifacts_live",
            Unit::Count,
            "Current number of artifacts held in the store."
        );
        describe_counter!(
            "mdconvert_artifacts_evicted_total",
            Unit::Count,
            "Total number of artifacts evicted after the retention window."
        );
        describe_counter!(
            "mdconvert_uploads_accepted_total",
            Unit::Count,
            "Total number of uploads stored."
        );
        describe_counter!(
            "mdconvert_uploads_rejected_total",
            Unit::Count,
            "Total number of uploads refused, by reason."
        );
        describe_counter!(
            "mdconvert_downloads_total",
            Unit::Count,
            "Total number of deliverables served, by format."
        );
        describe_histogram!(
            "mdconvert_render_ms",
            Unit::Milliseconds,
            "Markdown render latency in milliseconds."
        );
    });
}
