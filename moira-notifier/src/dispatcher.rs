//! The dispatcher (§4.4): periodically drains due notifications, groups
//! them into packages, and hands each package to its sender channel.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use moira_common::{Clock, NotificationPackage, ScheduledNotification};
use moira_store::Store;
use tokio::sync::mpsc::Sender as ChannelSender;
use tracing::{error, warn};

use crate::resend::resend;

/// Tick interval between drain-and-dispatch passes.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Registered sender channels, keyed by contact type (`"mail"`, `"slack"`, a
/// script sender's configured name, ...).
///
/// Bounded to one in-flight package per channel: the receiving worker must
/// be ready to take it (or have just finished its previous delivery)
/// before a hand-off completes, which is what makes `sender_timeout`
/// meaningful instead of an unbounded queue a stuck sender never drains.
pub type SenderChannels = HashMap<String, ChannelSender<NotificationPackage>>;

/// Channel capacity each registered sender's hand-off queue is built with.
pub const CHANNEL_CAPACITY: usize = 1;

/// One drain-and-dispatch pass: pull every due notification, group into
/// packages, and route each to its sender channel.
///
/// Packages whose contact type has no registered channel take the resend
/// path immediately, the same as a delivery failure (§4.4 step 3).
#[tracing::instrument(skip(store, clock, senders, sender_timeout, resending_timeout))]
pub async fn dispatch_tick(
    store: &dyn Store,
    clock: &dyn Clock,
    senders: &SenderChannels,
    sender_timeout: Duration,
    resending_timeout: Duration,
) {
    let now = clock.now();
    let due = match store.get_notifications(now).await {
        Ok(due) => due,
        Err(error) => {
            error!(%error, "failed to drain due notifications, will retry next tick");
            return;
        }
    };

    moira_metrics::record_queue_depth(due.len() as u64);

    if due.is_empty() {
        return;
    }

    // Each package's hand-off races its own timeout independently; all
    // attempts of this tick run concurrently and the tick doesn't return
    // until every one of them has settled.
    let mut attempts = FuturesUnordered::new();
    for package in group_into_packages(due) {
        attempts.push(dispatch_one(store, clock, senders, sender_timeout, resending_timeout, package));
    }
    while attempts.next().await.is_some() {}
}

async fn dispatch_one(
    store: &dyn Store,
    clock: &dyn Clock,
    senders: &SenderChannels,
    sender_timeout: Duration,
    resending_timeout: Duration,
    package: NotificationPackage,
) {
    let Some(channel) = senders.get(&package.contact.kind) else {
        warn!(contact_type = %package.contact.kind, "no sender registered for contact type");
        moira_metrics::record_send_failed(&package.contact.kind);
        resend(store, clock, package, resending_timeout).await;
        return;
    };

    match tokio::time::timeout(sender_timeout, send_to_channel(channel, package.clone())).await {
        Ok(Ok(())) => moira_metrics::record_send_ok(&package.contact.kind),
        Ok(Err(_)) | Err(_) => {
            warn!(%package, "dispatch hand-off failed or timed out, taking resend path");
            moira_metrics::record_send_failed(&package.contact.kind);
            resend(store, clock, package, resending_timeout).await;
        }
    }
}

async fn send_to_channel(
    channel: &ChannelSender<NotificationPackage>,
    package: NotificationPackage,
) -> Result<(), ()> {
    channel.send(package).await.map_err(|_| ())
}

/// Group due notifications by `(contact.type, contact.value, trigger.id)`,
/// carrying forward the `throttled`/`fail_count` of each group's first
/// notification.
fn group_into_packages(due: Vec<ScheduledNotification>) -> Vec<NotificationPackage> {
    let mut groups: HashMap<(String, String, String), NotificationPackage> = HashMap::new();
    let mut order = Vec::new();

    for notification in due {
        let key = (
            notification.contact.kind.clone(),
            notification.contact.value.clone(),
            notification.event.trigger_id.clone(),
        );

        groups
            .entry(key.clone())
            .and_modify(|package| package.events.push(notification.event.clone()))
            .or_insert_with(|| {
                order.push(key.clone());
                NotificationPackage {
                    events: vec![notification.event.clone()],
                    trigger: notification.trigger.clone(),
                    contact: notification.contact.clone(),
                    throttled: notification.throttled,
                    fail_count: notification.send_fail,
                    do_not_resend: false,
                }
            });
    }

    order.into_iter().filter_map(|key| groups.remove(&key)).collect()
}

#[cfg(test)]
mod tests {
    use moira_common::{Contact, Event, FixedClock, State, Trigger};
    use moira_store::InMemoryStore;
    use tokio::sync::mpsc;

    use super::*;

    fn notification(trigger_id: &str, contact_value: &str, ts: i64) -> ScheduledNotification {
        ScheduledNotification {
            event: Event {
                timestamp: ts,
                metric: "metric.name".to_string(),
                value: 1.0,
                state: State::Error,
                old_state: State::Ok,
                trigger_id: trigger_id.to_string(),
                subscription_id: None,
                message: None,
            },
            trigger: Trigger {
                id: trigger_id.to_string(),
                ..Default::default()
            },
            contact: Contact {
                id: "contact-1".to_string(),
                kind: "mail".to_string(),
                value: contact_value.to_string(),
                user: String::new(),
            },
            throttled: false,
            send_fail: 0,
            timestamp: ts,
        }
    }

    #[test]
    fn groups_merge_by_contact_and_trigger() {
        let due = vec![
            notification("trigger-1", "a@example.com", 100),
            notification("trigger-1", "a@example.com", 100),
            notification("trigger-1", "b@example.com", 100),
        ];
        let packages = group_into_packages(due);
        assert_eq!(packages.len(), 2);
        assert_eq!(
            packages
                .iter()
                .find(|p| p.contact.value == "a@example.com")
                .unwrap()
                .events
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn dispatch_delivers_to_registered_sender() {
        let store = InMemoryStore::new();
        let clock = FixedClock::new(1_441_188_915);
        store.add_notification(notification("trigger-1", "a@example.com", 1_441_188_915)).await.unwrap();

        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut senders = SenderChannels::new();
        senders.insert("mail".to_string(), tx);

        dispatch_tick(&store, &clock, &senders, Duration::from_secs(1), Duration::from_secs(3600)).await;

        let package = rx.try_recv().unwrap();
        assert_eq!(package.contact.value, "a@example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_resends_when_the_channel_hand_off_times_out() {
        let store = InMemoryStore::new();
        let clock = FixedClock::new(1_441_188_915);
        store.add_notification(notification("trigger-1", "a@example.com", 1_441_188_915)).await.unwrap();

        // Capacity-1 channel with a full buffer and no reader: the next
        // hand-off has nowhere to go, so it must block until it times out
        // rather than completing instantly the way an unbounded send would.
        let (tx, _rx) = mpsc::channel(CHANNEL_CAPACITY);
        tx.try_send(NotificationPackage {
            events: vec![],
            trigger: Trigger::default(),
            contact: Contact {
                kind: "mail".to_string(),
                ..Default::default()
            },
            throttled: false,
            fail_count: 0,
            do_not_resend: false,
        })
        .unwrap();
        let mut senders = SenderChannels::new();
        senders.insert("mail".to_string(), tx);

        dispatch_tick(&store, &clock, &senders, Duration::from_millis(50), Duration::from_secs(3600)).await;

        let pending = store.get_notifications(1_441_188_915 + 120).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].send_fail, 1);
    }

    #[tokio::test]
    async fn dispatch_resends_when_no_sender_registered() {
        let store = InMemoryStore::new();
        let clock = FixedClock::new(1_441_188_915);
        store.add_notification(notification("trigger-1", "a@example.com", 1_441_188_915)).await.unwrap();

        let senders = SenderChannels::new();
        dispatch_tick(&store, &clock, &senders, Duration::from_secs(1), Duration::from_secs(3600)).await;

        let pending = store.get_notifications(1_441_188_915 + 120).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].send_fail, 1);
    }
}
