//! Tracing subscriber setup with format selection.

use anyhow::{Context, Result};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::{LogFormat, TracingConfig};

/// Guard returned by [`init_tracing`].
///
/// Keep it alive for the duration of the program.
#[derive(Debug)]
pub struct TracingGuard {
    _private: (),
}

/// Initialize the global tracing subscriber with the given configuration.
///
/// An invalid filter falls back to `info`. Fails if a global subscriber is
/// already installed.
///
/// # Example
///
/// ```ignore
/// let _guard = init_tracing(TracingConfig::from_env())?;
/// ```
pub fn init_tracing(config: TracingConfig) -> Result<TracingGuard> {
    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt_layer(&config).with_filter(filter))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(TracingGuard { _private: () })
}

/// The formatting layer for `config`. Guest output owns stdout, so logs go to stderr.
fn fmt_layer(config: &TracingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.include_location())
        .with_line_number(config.include_location())
        .with_target(config.include_target())
        .with_thread_names(config.include_thread_names())
        .with_thread_ids(config.include_thread_ids());

    match config.log_format() {
        LogFormat::Json => base
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .flatten_event(true)
            .boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}
