//! The self-state monitor (§4.6): a watchdog that notices when upstream
//! producers — the metric ingestor and the trigger checker — go quiet, and
//! raises synthetic admin alerts rather than silently going stale.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use moira_common::{Clock, Contact, Event, NotificationPackage, State, Trigger};
use moira_store::Store;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, warn};

/// Tick interval for self-state sampling.
pub const TICK_INTERVAL: Duration = Duration::from_secs(10);

/// Static configuration for the watchdog's three staleness thresholds.
#[derive(Debug, Clone)]
pub struct SelfStateConfig {
    pub enabled: bool,
    pub redis_disconnect_delay: Duration,
    pub last_metric_received_delay: Duration,
    pub last_check_delay: Duration,
    pub notice_interval: Duration,
    pub admin_contacts: Vec<Contact>,
}

/// Mutable watchdog state carried between ticks.
pub struct SelfStateMonitor {
    config: SelfStateConfig,
    redis_last_check: AtomicI64,
    last_metric_received: AtomicI64,
    last_check: AtomicI64,
    next_send_allowed: AtomicI64,
    /// Previously sampled counter values; the timestamps above only
    /// advance when a fresh sample differs from these (mirrors the
    /// original's `metricsCount != mc` check).
    prev_metrics_count: AtomicU64,
    prev_checks_count: AtomicU64,
}

impl SelfStateMonitor {
    #[must_use]
    pub fn new(config: SelfStateConfig, now: i64) -> Self {
        Self {
            config,
            redis_last_check: AtomicI64::new(now),
            last_metric_received: AtomicI64::new(now),
            last_check: AtomicI64::new(now),
            next_send_allowed: AtomicI64::new(0),
            prev_metrics_count: AtomicU64::new(0),
            prev_checks_count: AtomicU64::new(0),
        }
    }

    /// Sample the store's counters and raise an admin alert if one of the
    /// three staleness conditions is met, at most once per `notice_interval`.
    pub async fn tick(&self, store: &dyn Store, clock: &dyn Clock, admin_channel: &UnboundedSender<NotificationPackage>) {
        if !self.config.enabled {
            return;
        }

        let now = clock.now();

        let metrics = store.get_metrics_count().await;
        let checks = store.get_checks_count().await;

        if metrics.is_ok() && checks.is_ok() {
            self.redis_last_check.store(now, Ordering::SeqCst);
        }

        match metrics {
            Ok(count) => {
                if self.prev_metrics_count.swap(count, Ordering::SeqCst) != count {
                    self.last_metric_received.store(now, Ordering::SeqCst);
                }
            }
            Err(error) => warn!(%error, "self-state monitor failed to sample metrics counter"),
        }

        match checks {
            Ok(count) => {
                if self.prev_checks_count.swap(count, Ordering::SeqCst) != count {
                    self.last_check.store(now, Ordering::SeqCst);
                }
            }
            Err(error) => warn!(%error, "self-state monitor failed to sample checks counter"),
        }

        if now < self.next_send_allowed.load(Ordering::SeqCst) {
            return;
        }

        let alarm = self.alarm_trigger_name(now);
        if let Some(trigger_name) = alarm {
            self.next_send_allowed
                .store(now + self.config.notice_interval.as_secs() as i64, Ordering::SeqCst);
            self.raise(clock, admin_channel, &trigger_name).await;
        }
    }

    fn alarm_trigger_name(&self, now: i64) -> Option<&'static str> {
        if now - self.redis_last_check.load(Ordering::SeqCst) > self.config.redis_disconnect_delay.as_secs() as i64 {
            return Some("Redis disconnected");
        }
        if now - self.last_metric_received.load(Ordering::SeqCst) > self.config.last_metric_received_delay.as_secs() as i64 {
            return Some("Moira-Cache does not received new metrics");
        }
        if now - self.last_check.load(Ordering::SeqCst) > self.config.last_check_delay.as_secs() as i64 {
            return Some("Moira-Checker does not checks triggers");
        }
        None
    }

    async fn raise(&self, clock: &dyn Clock, admin_channel: &UnboundedSender<NotificationPackage>, trigger_name: &str) {
        let now = clock.now();
        let trigger = Trigger {
            id: "moira-self-state".to_string(),
            name: trigger_name.to_string(),
            ..Default::default()
        };
        let event = Event {
            timestamp: now,
            metric: String::new(),
            value: 0.0,
            state: State::Error,
            old_state: State::Ok,
            trigger_id: trigger.id.clone(),
            subscription_id: None,
            message: Some(trigger_name.to_string()),
        };

        for contact in &self.config.admin_contacts {
            let package = NotificationPackage {
                events: vec![event.clone()],
                trigger: trigger.clone(),
                contact: contact.clone(),
                throttled: false,
                fail_count: 0,
                do_not_resend: true,
            };
            if admin_channel.send(package).is_err() {
                error!(trigger_name, "admin sender channel closed, dropping self-state alert");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use moira_common::FixedClock;
    use moira_store::InMemoryStore;
    use tokio::sync::mpsc;

    use super::*;

    fn config() -> SelfStateConfig {
        SelfStateConfig {
            enabled: true,
            redis_disconnect_delay: Duration::from_secs(30),
            last_metric_received_delay: Duration::from_secs(60),
            last_check_delay: Duration::from_secs(120),
            notice_interval: Duration::from_secs(300),
            admin_contacts: vec![Contact {
                id: "admin-1".to_string(),
                kind: "mail".to_string(),
                value: "admin@example.com".to_string(),
                user: "admin".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn healthy_store_raises_nothing() {
        let store = InMemoryStore::new();
        let clock = FixedClock::new(1_441_188_915);
        let monitor = SelfStateMonitor::new(config(), clock.now());
        let (tx, mut rx) = mpsc::unbounded_channel();

        monitor.tick(&store, &clock, &tx).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_metrics_raise_an_admin_alert() {
        let store = InMemoryStore::new();
        let clock = FixedClock::new(1_441_188_915);
        let monitor = SelfStateMonitor::new(config(), clock.now());
        let (tx, mut rx) = mpsc::unbounded_channel();

        clock.advance(3600);
        monitor.tick(&store, &clock, &tx).await;

        let package = rx.try_recv().unwrap();
        assert!(package.do_not_resend);
        assert_eq!(package.contact.value, "admin@example.com");
    }

    #[tokio::test]
    async fn advancing_metrics_counter_keeps_the_cache_alarm_from_firing() {
        let store = InMemoryStore::new();
        let clock = FixedClock::new(1_441_188_915);
        let monitor = SelfStateMonitor::new(config(), clock.now());
        let (tx, mut rx) = mpsc::unbounded_channel();

        // A steady, non-zero metrics counter alone must not count as fresh;
        // only a change since the previous sample does.
        store.push_event(Event {
            timestamp: clock.now(),
            metric: "metric.name".to_string(),
            value: 1.0,
            state: State::Ok,
            old_state: State::Ok,
            trigger_id: "trigger-1".to_string(),
            subscription_id: None,
            message: None,
        });

        for _ in 0..5 {
            clock.advance(10);
            monitor.tick(&store, &clock, &tx).await;
        }
        assert!(rx.try_recv().is_err());

        clock.advance(120);
        monitor.tick(&store, &clock, &tx).await;
        let package = rx.try_recv().unwrap();
        assert_eq!(package.trigger.name, "Moira-Cache does not received new metrics");
    }

    #[tokio::test]
    async fn notice_interval_suppresses_repeat_alerts() {
        let store = InMemoryStore::new();
        let clock = FixedClock::new(1_441_188_915);
        let monitor = SelfStateMonitor::new(config(), clock.now());
        let (tx, mut rx) = mpsc::unbounded_channel();

        clock.advance(3600);
        monitor.tick(&store, &clock, &tx).await;
        assert!(rx.try_recv().is_ok());

        monitor.tick(&store, &clock, &tx).await;
        assert!(rx.try_recv().is_err());
    }
}
