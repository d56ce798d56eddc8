//! The event processor (§4.3): turns one raw [`Event`] into zero or more
//! queued [`ScheduledNotification`]s, one per matching (subscription ×
//! contact) pair.

use std::collections::HashSet;

use moira_common::{model::pseudo_tags, model::tags_subset, Clock, Event, ScheduledNotification, State};
use moira_store::Store;
use tracing::{debug, warn};

use crate::error::NotifierError;
use crate::throttle::compute_next_delivery;

/// Process one event to completion: resolve matching subscriptions, build a
/// notification per contact, and persist each via `store`.
///
/// Store failures loading the trigger, its tags, or the tag-union
/// subscription set are fatal and returned to the caller. Contact-load
/// failures and tag mismatches are logged and the affected subscription is
/// skipped.
#[tracing::instrument(skip(store, clock), fields(trigger_id = %event.trigger_id, state = %event.state))]
pub async fn process(store: &dyn Store, clock: &dyn Clock, event: &Event) -> Result<(), NotifierError> {
    moira_metrics::record_event_received();

    let result = process_inner(store, clock, event).await;
    match &result {
        Ok(()) => moira_metrics::record_event_processed(),
        Err(_) => moira_metrics::record_event_malformed(),
    }
    result
}

async fn process_inner(store: &dyn Store, clock: &dyn Clock, event: &Event) -> Result<(), NotifierError> {
    let (trigger, available_tags, subscriptions) = if event.state == State::Test {
        let subscription_id = event.subscription_id.as_deref().unwrap_or_default();
        let subscription = store.get_subscription(subscription_id).await?;
        (moira_common::Trigger::default(), Vec::new(), vec![subscription])
    } else {
        if event.trigger_id.is_empty() {
            return Err(NotifierError::EmptyTriggerId);
        }

        let mut trigger = store.get_trigger(&event.trigger_id).await?;
        trigger.tags = store.get_trigger_tags(&event.trigger_id).await?;

        let mut available_tags = trigger.tags.clone();
        available_tags.extend(pseudo_tags(event.old_state, event.state));

        let subscriptions = store.get_tags_subscriptions(&available_tags).await?;
        (trigger, available_tags, subscriptions)
    };

    let mut seen = HashSet::new();

    for subscription in &subscriptions {
        let matches = event.state == State::Test
            || (subscription.enabled && tags_subset(&subscription.tags, &available_tags));

        if !matches {
            debug!(subscription_id = %subscription.id, "subscription tags are not a subset of the event's tags, skipping");
            continue;
        }

        for contact_id in &subscription.contacts {
            let contact = match store.get_contact(contact_id).await {
                Ok(contact) => contact,
                Err(error) => {
                    warn!(%contact_id, %error, "failed to load contact, skipping");
                    continue;
                }
            };

            let (timestamp, throttled) =
                compute_next_delivery(store, clock, event, subscription, 0).await;

            let notification = ScheduledNotification {
                event: event.clone(),
                trigger: trigger.clone(),
                contact,
                throttled,
                send_fail: 0,
                timestamp,
            };

            let dedup_key = notification.dedup_key();
            if !seen.insert(dedup_key) {
                continue;
            }

            moira_metrics::record_notification_scheduled();
            if throttled {
                moira_metrics::record_notification_throttled();
            }
            store.add_notification(notification).await?;
        }
    }

    if event.state != State::Test {
        store.record_trigger_event(&event.trigger_id, event.timestamp);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use moira_common::{Contact, FixedClock, Schedule, Subscription, Trigger};
    use moira_store::InMemoryStore;

    use super::*;

    fn seed(store: &InMemoryStore) {
        store.put_trigger(Trigger {
            id: "trigger-1".to_string(),
            name: "cpu high".to_string(),
            tags: vec!["cpu".to_string()],
            ..Default::default()
        });
        store.put_subscription(Subscription {
            id: "sub-1".to_string(),
            contacts: vec!["contact-1".to_string()],
            tags: vec!["cpu".to_string()],
            schedule: Schedule::default(),
            enabled: true,
            throttling_enabled: false,
        });
        store.put_contact(Contact {
            id: "contact-1".to_string(),
            kind: "mail".to_string(),
            value: "oncall@example.com".to_string(),
            user: "oncall".to_string(),
        });
    }

    fn sample_event() -> Event {
        Event {
            timestamp: 1_441_188_915,
            metric: "cpu.load".to_string(),
            value: 99.0,
            state: State::Error,
            old_state: State::Ok,
            trigger_id: "trigger-1".to_string(),
            subscription_id: None,
            message: None,
        }
    }

    #[tokio::test]
    async fn matching_subscription_produces_one_notification() {
        let store = InMemoryStore::new();
        seed(&store);
        let clock = FixedClock::new(1_441_188_915);

        process(&store, &clock, &sample_event()).await.unwrap();

        let drained = store.get_notifications(1_441_188_915 + 10_000).await.unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].contact.value, "oncall@example.com");
    }

    #[tokio::test]
    async fn mismatched_tags_produce_no_notification() {
        let store = InMemoryStore::new();
        store.put_trigger(Trigger {
            id: "trigger-1".to_string(),
            tags: vec!["memory".to_string()],
            ..Default::default()
        });
        store.put_subscription(Subscription {
            id: "sub-1".to_string(),
            contacts: vec!["contact-1".to_string()],
            tags: vec!["cpu".to_string()],
            schedule: Schedule::default(),
            enabled: true,
            throttling_enabled: false,
        });
        store.put_contact(Contact {
            id: "contact-1".to_string(),
            kind: "mail".to_string(),
            value: "oncall@example.com".to_string(),
            user: String::new(),
        });
        let clock = FixedClock::new(1_441_188_915);

        process(&store, &clock, &sample_event()).await.unwrap();

        let drained = store.get_notifications(1_441_188_915 + 10_000).await.unwrap();
        assert!(drained.is_empty());
    }

    #[tokio::test]
    async fn empty_trigger_id_is_an_error() {
        let store = InMemoryStore::new();
        let clock = FixedClock::new(1_441_188_915);
        let mut event = sample_event();
        event.trigger_id = String::new();

        let result = process(&store, &clock, &event).await;
        assert!(matches!(result, Err(NotifierError::EmptyTriggerId)));
    }

    #[tokio::test]
    async fn test_state_uses_singleton_subscription_bypassing_tags() {
        let store = InMemoryStore::new();
        store.put_subscription(Subscription {
            id: "sub-test".to_string(),
            contacts: vec!["contact-1".to_string()],
            tags: vec!["unrelated".to_string()],
            schedule: Schedule::default(),
            enabled: false,
            throttling_enabled: false,
        });
        store.put_contact(Contact {
            id: "contact-1".to_string(),
            kind: "mail".to_string(),
            value: "oncall@example.com".to_string(),
            user: String::new(),
        });
        let clock = FixedClock::new(1_441_188_915);

        let event = Event {
            timestamp: 1_441_188_915,
            metric: String::new(),
            value: 0.0,
            state: State::Test,
            old_state: State::Test,
            trigger_id: String::new(),
            subscription_id: Some("sub-test".to_string()),
            message: None,
        };

        process(&store, &clock, &event).await.unwrap();

        let drained = store.get_notifications(1_441_188_915 + 10_000).await.unwrap();
        assert_eq!(drained.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_dedup_keys_within_a_pass_are_collapsed() {
        let store = InMemoryStore::new();
        seed(&store);
        store.put_subscription(Subscription {
            id: "sub-2".to_string(),
            contacts: vec!["contact-1".to_string()],
            tags: vec!["cpu".to_string()],
            schedule: Schedule::default(),
            enabled: true,
            throttling_enabled: false,
        });
        let clock = FixedClock::new(1_441_188_915);

        process(&store, &clock, &sample_event()).await.unwrap();

        let drained = store.get_notifications(1_441_188_915 + 10_000).await.unwrap();
        assert_eq!(drained.len(), 1);
    }
}
