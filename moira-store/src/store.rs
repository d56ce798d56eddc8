//! The abstract `Store` contract (§6): everything the notifier reads from or
//! writes to the shared Redis-like state, named the way the original
//! operations are named so call sites read like the design doc.

use std::time::Duration;

use async_trait::async_trait;
use moira_common::{Contact, Event, ScheduledNotification, Subscription, Trigger};

use crate::error::Result;

/// Everything the notifier needs from the shared key/value store.
///
/// Implementations only need to honour the semantics documented on each
/// method; nothing above this trait cares whether the state lives in a
/// `HashMap` or a real Redis cluster.
#[async_trait]
pub trait Store: Send + Sync {
    /// Block for up to `timeout` waiting for the next ingress event.
    /// Returns `None` on timeout, never an error — a quiet ingress queue is
    /// not a store failure.
    async fn fetch_event(&self, timeout: Duration) -> Option<Event>;

    /// Push an event onto the ingress queue. Not part of the notifier's own
    /// read path; exists so producers (the metric ingestor, the checker, or
    /// a test harness) can drive the engine.
    fn push_event(&self, event: Event);

    async fn get_trigger(&self, id: &str) -> Result<Trigger>;
    async fn get_contact(&self, id: &str) -> Result<Contact>;
    async fn get_subscription(&self, id: &str) -> Result<Subscription>;

    /// Error if the trigger has no tags at all.
    async fn get_trigger_tags(&self, id: &str) -> Result<Vec<String>>;

    /// Union of subscription ids indexed under any of `tags`, resolved to
    /// their full records.
    async fn get_tags_subscriptions(&self, tags: &[String]) -> Result<Vec<Subscription>>;

    /// Insert into the delayed-delivery set, keyed by `notification.timestamp`.
    async fn add_notification(&self, notification: ScheduledNotification) -> Result<()>;

    /// Atomically range-and-remove every notification with
    /// `timestamp <= upto`. Implementations must not allow the same
    /// notification to be returned twice, even under concurrent callers.
    async fn get_notifications(&self, upto: i64) -> Result<Vec<ScheduledNotification>>;

    /// `(next_allowed, throttling_beginning)`, defaulting to `(0, 0)` for a
    /// trigger that has never been throttled.
    async fn get_trigger_throttling_timestamps(&self, trigger_id: &str) -> Result<(i64, i64)>;

    async fn set_trigger_throttling_timestamp(&self, trigger_id: &str, next_allowed: i64) -> Result<()>;

    /// Record one state-change event against a trigger's event-count index,
    /// used by the throttling engine's windowed counts.
    fn record_trigger_event(&self, trigger_id: &str, timestamp: i64);

    /// Count of events recorded for `trigger_id` with timestamp `>= from`.
    async fn get_trigger_events_count(&self, trigger_id: &str, from: i64) -> Result<u64>;

    /// Monotonic counter advanced whenever the metric ingestor writes a new
    /// sample. Sampled by the self-state monitor.
    async fn get_metrics_count(&self) -> Result<u64>;

    /// Monotonic counter advanced whenever the trigger checker completes a
    /// check pass. Sampled by the self-state monitor.
    async fn get_checks_count(&self) -> Result<u64>;

    /// Record that the checker completed a check pass. Exists for test
    /// harnesses and co-located checker components to drive
    /// `get_checks_count`; the notifier itself never calls this.
    fn record_check(&self);

    /// Hostname-based leadership advisory. Informational only — no
    /// notifier behaviour depends on whether a hostname is registered.
    async fn register_notifier(&self, hostname: &str) -> Result<()>;
    async fn unregister_notifier(&self, hostname: &str) -> Result<()>;
}
