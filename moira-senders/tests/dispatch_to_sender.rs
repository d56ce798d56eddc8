//! End-to-end: a scheduled notification drains through the dispatcher into
//! a registered sender's channel and is delivered by its worker.

use std::time::Duration;

use moira_common::{Contact, Event, FixedClock, Schedule, State, Subscription, Trigger};
use moira_notifier::dispatcher::dispatch_tick;
use moira_senders::{LogSender, SenderConfig, SenderPool};
use moira_store::{InMemoryStore, Store};
use pretty_assertions::assert_eq;
use tokio::sync::broadcast;

const ANCHOR: i64 = 1_441_188_915;

#[tokio::test]
async fn event_reaches_a_registered_sender_end_to_end() {
    let store = InMemoryStore::new();
    let clock = FixedClock::new(ANCHOR);

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

    let event = Event {
        timestamp: ANCHOR,
        metric: "cpu.load".to_string(),
        value: 99.0,
        state: State::Error,
        old_state: State::Ok,
        trigger_id: "trigger-1".to_string(),
        subscription_id: None,
        message: None,
    };
    moira_notifier::event_processor::process(&store, &clock, &event)
        .await
        .unwrap();

    let configured: Vec<(SenderConfig, Box<dyn moira_common::traits::Sender>)> = vec![(
        SenderConfig {
            kind: "mail".to_string(),
            name: None,
            settings: serde_json::Value::Null,
        },
        Box::new(LogSender::new("mail")),
    )];
    let (pool, channels) = SenderPool::build(configured).await.unwrap();

    dispatch_tick(&store, &clock, &channels, Duration::from_secs(1), Duration::from_secs(3600)).await;
    drop(channels);

    let (shutdown, _receiver) = broadcast::channel(1);
    pool.run(&store, &clock, Duration::from_secs(3600), &shutdown).await;

    let remaining = store.get_notifications(ANCHOR + 10_000).await.unwrap();
    assert_eq!(remaining.len(), 0);
}
