//! Structured logging setup shared by every `moira-*` binary and test harness.
//!
//! Compact, ANSI-enabled output in debug builds, quieter output in release,
//! and a `target` filter that keeps third-party crate noise out of the
//! notifier's own log stream.

use chrono::Utc;
use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    filter::FilterFn, fmt::time::FormatTime, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt, Layer,
};

struct Time;

impl FormatTime for Time {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let time = Utc::now();
        w.write_fmt(format_args!("{:?}", time.timestamp_micros()))
    }
}

/// Initialise the global `tracing` subscriber.
///
/// `level_override` takes priority over `LOG_LEVEL`, which takes priority
/// over the build-profile default (`TRACE` in debug, `INFO` in release).
/// Call this once, at process start.
pub fn init(level_override: Option<&str>) {
    let level = level_override
        .map(str::to_ascii_lowercase)
        .or_else(|| std::env::var("LOG_LEVEL").ok().map(|v| v.to_ascii_lowercase()))
        .map(|level| match level.as_str() {
            "error" => LevelFilter::ERROR,
            "warn" => LevelFilter::WARN,
            "info" => LevelFilter::INFO,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            _ => LevelFilter::INFO,
        })
        .unwrap_or(if cfg!(debug_assertions) {
            LevelFilter::TRACE
        } else {
            LevelFilter::INFO
        });

    tracing_subscriber::Registry::default()
        .with(
            (if cfg!(debug_assertions) {
                tracing_subscriber::fmt::layer()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_file(false)
                    .with_line_number(false)
            })
            .compact()
            .with_ansi(cfg!(debug_assertions))
            .with_timer(Time)
            .with_target(false)
            .with_filter(level)
            .with_filter(FilterFn::new(|metadata| {
                metadata.target().starts_with("moira")
            })),
        )
        .init();
}
