//! The data model §3 describes: events, triggers, contacts, subscriptions,
//! schedules, and the notifications that flow between them.
//!
//! Every type here is a read-only snapshot as seen by the core — nothing in
//! this crate mutates a `Trigger` or `Contact`; they're fetched from the
//! store, embedded into a `ScheduledNotification`, and carried along for the
//! life of that notification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The state of a single metric, as reported by a trigger's check.
///
/// `Ok < Warn < Error < NoData` is a total order on the four "real" states;
/// `Test` carries no weight and bypasses both throttling and tag matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "NODATA")]
    NoData,
    #[serde(rename = "TEST")]
    Test,
}

impl State {
    /// Severity weight used to derive pseudo-tags from a state transition.
    /// `None` for `Test`, which participates in neither ordering nor weighting.
    #[must_use]
    pub const fn weight(self) -> Option<i64> {
        match self {
            Self::Ok => Some(0),
            Self::Warn => Some(1),
            Self::Error => Some(100),
            Self::NoData => Some(10_000),
            Self::Test => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::NoData => "NODATA",
            Self::Test => "TEST",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tags synthesized from a state transition (§4.3), appended to the
/// trigger's own tags before matching against subscriptions.
#[must_use]
pub fn pseudo_tags(old_state: State, new_state: State) -> Vec<String> {
    let mut tags = vec![new_state.as_str().to_string(), old_state.as_str().to_string()];

    if let (Some(old_weight), Some(new_weight)) = (old_state.weight(), new_state.weight()) {
        if new_weight - old_weight >= 100 {
            tags.push("HIGH DEGRADATION".to_string());
            tags.push("DEGRADATION".to_string());
        } else if new_weight > old_weight {
            tags.push("DEGRADATION".to_string());
        }

        if new_weight < old_weight {
            tags.push("PROGRESS".to_string());
        }
    }

    tags
}

/// `true` if every tag `subscription_tags` requires is present in `available`.
#[must_use]
pub fn tags_subset(subscription_tags: &[String], available: &[String]) -> bool {
    subscription_tags.iter().all(|tag| available.contains(tag))
}

/// A single transition record for one metric of one trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: i64,
    pub metric: String,
    pub value: f64,
    pub state: State,
    pub old_state: State,
    pub trigger_id: String,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A named rule producing state-change events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub warn_value: Option<f64>,
    #[serde(default)]
    pub error_value: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A destination address paired with a channel type (`"mail"`, `"slack"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub user: String,
}

/// A 7-slot weekday enabled mask plus a local-time delivery window.
///
/// `days` must have length 0 (schedule disabled, always allowed) or 7
/// (one entry per weekday, Monday-indexed at 0); any other length is
/// rejected by the schedule evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub days: Vec<bool>,
    /// Minutes since local midnight the window opens.
    pub start_offset: i64,
    /// Minutes since local midnight the window closes.
    pub end_offset: i64,
    /// Minutes to subtract from UTC to get the schedule's local time.
    pub timezone_offset: i64,
}

/// A routing rule binding a tag set to a list of contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub throttling_enabled: bool,
}

const fn default_true() -> bool {
    true
}

/// A notification queued for delivery at `timestamp`, carrying everything
/// the eventual sender needs without re-fetching from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub event: Event,
    pub trigger: Trigger,
    pub contact: Contact,
    pub throttled: bool,
    pub send_fail: u32,
    /// Target delivery instant, UNIX seconds.
    pub timestamp: i64,
}

impl ScheduledNotification {
    /// The de-dup key from §3: at most one live notification may exist per
    /// key at the moment it's enqueued.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
            self.contact.kind,
            self.contact.value,
            self.event.trigger_id,
            self.event.metric,
            self.event.state,
            self.event.timestamp,
            self.event.value,
            self.send_fail,
            self.throttled,
            self.timestamp,
        )
    }
}

/// Notifications merged by `(contact.type, contact.value, trigger.id)` for a
/// single delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPackage {
    pub events: Vec<Event>,
    pub trigger: Trigger,
    pub contact: Contact,
    pub throttled: bool,
    pub fail_count: u32,
    /// Suppresses the resend path. Set on self-state admin alerts to avoid
    /// feedback loops when the store itself is unhealthy.
    pub do_not_resend: bool,
}

impl fmt::Display for NotificationPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "package of {} notifications to {}",
            self.events.len(),
            self.contact.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudo_tags_always_includes_states() {
        let tags = pseudo_tags(State::Ok, State::Warn);
        assert!(tags.contains(&"WARN".to_string()));
        assert!(tags.contains(&"OK".to_string()));
    }

    #[test]
    fn pseudo_tags_high_degradation() {
        // OK(0) -> ERROR(100): delta 100 >= 100
        let tags = pseudo_tags(State::Ok, State::Error);
        assert_eq!(
            tags,
            vec!["ERROR", "OK", "HIGH DEGRADATION", "DEGRADATION"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn pseudo_tags_plain_degradation() {
        // OK(0) -> WARN(1): delta 1, < 100
        let tags = pseudo_tags(State::Ok, State::Warn);
        assert_eq!(
            tags,
            vec!["WARN", "OK", "DEGRADATION"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn pseudo_tags_progress() {
        // ERROR(100) -> OK(0): new < old
        let tags = pseudo_tags(State::Error, State::Ok);
        assert_eq!(
            tags,
            vec!["OK", "ERROR", "PROGRESS"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn pseudo_tags_test_state_contributes_nothing_extra() {
        let tags = pseudo_tags(State::Test, State::Test);
        assert_eq!(tags, vec!["TEST".to_string(), "TEST".to_string()]);
    }

    #[test]
    fn tags_subset_checks_every_element() {
        let available = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(tags_subset(&["a".to_string(), "b".to_string()], &available));
        assert!(!tags_subset(&["a".to_string(), "z".to_string()], &available));
        assert!(tags_subset(&[], &available));
    }

    #[test]
    fn dedup_key_is_stable_for_identical_notifications() {
        let notification = sample_notification();
        assert_eq!(notification.dedup_key(), notification.clone().dedup_key());
    }

    #[test]
    fn dedup_key_differs_on_fail_count() {
        let mut a = sample_notification();
        let mut b = a.clone();
        b.send_fail = 1;
        assert_ne!(a.dedup_key(), b.dedup_key());
        a.send_fail = 1;
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    fn sample_notification() -> ScheduledNotification {
        ScheduledNotification {
            event: Event {
                timestamp: 1_441_188_915,
                metric: "metric.name".to_string(),
                value: 12.0,
                state: State::Error,
                old_state: State::Ok,
                trigger_id: "trigger-1".to_string(),
                subscription_id: None,
                message: None,
            },
            trigger: Trigger {
                id: "trigger-1".to_string(),
                ..Default::default()
            },
            contact: Contact {
                id: "contact-1".to_string(),
                kind: "mail".to_string(),
                value: "mail1@example.com".to_string(),
                user: String::new(),
            },
            throttled: false,
            send_fail: 0,
            timestamp: 1_441_188_915,
        }
    }
}
