//! In-process metrics for the notification engine.
//!
//! Counters and gauges are recorded through the `metrics` facade and
//! exposed for scraping via `metrics-exporter-prometheus`; nothing here
//! pushes to a third-party telemetry backend.

mod config;
mod error;

use std::sync::atomic::{AtomicBool, Ordering};

use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

pub use config::MetricsConfig;
pub use error::MetricsError;

static ENABLED: AtomicBool = AtomicBool::new(false);
static EXPORTER_HANDLE: OnceCell<metrics_exporter_prometheus::PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder and bind its scrape endpoint.
///
/// A no-op if `config.enabled` is false. Calling this more than once
/// returns [`MetricsError::AlreadyInitialized`].
///
/// # Errors
/// Returns an error if the exporter cannot bind `config.listen_address`.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        tracing::info!("metrics collection is disabled");
        return Ok(());
    }

    if EXPORTER_HANDLE.get().is_some() {
        return Err(MetricsError::AlreadyInitialized);
    }

    let address: std::net::SocketAddr = config
        .listen_address
        .parse()
        .map_err(|_| MetricsError::InvalidAddress(config.listen_address.clone()))?;

    let handle = PrometheusBuilder::new()
        .with_http_listener(address)
        .install_recorder()
        .map_err(|source| MetricsError::ExporterBind {
            address: config.listen_address.clone(),
            source,
        })?;

    EXPORTER_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)?;
    ENABLED.store(true, Ordering::SeqCst);

    tracing::info!(address = %config.listen_address, "prometheus scrape endpoint listening");
    Ok(())
}

#[must_use]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::SeqCst)
}

/// An event was pulled off the ingress queue.
pub fn record_event_received() {
    metrics::counter!("moira_notifier_events_received_total").increment(1);
}

/// An event was processed to completion without a fatal store error.
pub fn record_event_processed() {
    metrics::counter!("moira_notifier_events_processed_total").increment(1);
}

/// An event or stored record failed to parse or load.
pub fn record_event_malformed() {
    metrics::counter!("moira_notifier_events_malformed_total").increment(1);
}

/// A notification was enqueued by the event processor or the resend path.
pub fn record_notification_scheduled() {
    metrics::counter!("moira_notifier_notifications_scheduled_total").increment(1);
}

/// A notification was enqueued with its throttled flag set.
pub fn record_notification_throttled() {
    metrics::counter!("moira_notifier_notifications_throttled_total").increment(1);
}

/// A package was handed off to its sender channel successfully.
pub fn record_send_ok(contact_type: &str) {
    metrics::counter!("moira_notifier_sends_ok_total", "contact_type" => contact_type.to_string()).increment(1);
}

/// A package's delivery failed, timed out, or had no registered sender.
pub fn record_send_failed(contact_type: &str) {
    metrics::counter!("moira_notifier_sends_failed_total", "contact_type" => contact_type.to_string()).increment(1);
}

/// Current count of notifications sitting in the delayed-delivery queue.
pub fn record_queue_depth(depth: u64) {
    metrics::gauge!("moira_notifier_queue_depth").set(depth as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_is_a_no_op() {
        let config = MetricsConfig {
            enabled: false,
            listen_address: "127.0.0.1:0".to_string(),
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn recorders_do_not_panic_without_an_installed_exporter() {
        record_event_received();
        record_event_processed();
        record_event_malformed();
        record_notification_scheduled();
        record_notification_throttled();
        record_send_ok("mail");
        record_send_failed("mail");
        record_queue_depth(0);
    }
}
