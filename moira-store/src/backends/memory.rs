//! In-memory `Store` implementation.
//!
//! Backs every entity behind an `RwLock<HashMap<..>>`, the same shape the
//! rest of this workspace uses for small bounded state. There is currently
//! no Redis-backed implementation: the `Store` trait is the seam where one
//! would plug in, but wiring a real Redis client is out of scope here (see
//! `DESIGN.md`). Seed methods (`put_trigger`, `put_contact`, ...) exist so
//! tests and the eventual admin-facing load path can populate state without
//! going through a network protocol.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use moira_common::{Contact, Event, ScheduledNotification, Subscription, Trigger};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::error::{Result, StoreError};
use crate::store::Store;

#[derive(Debug, Default)]
struct Tables {
    triggers: AHashMap<String, Trigger>,
    contacts: AHashMap<String, Contact>,
    subscriptions: AHashMap<String, Subscription>,
    /// tag -> subscription ids referencing it
    tags_index: AHashMap<String, Vec<String>>,
    /// trigger id -> (next_allowed, throttling_beginning)
    throttling: AHashMap<String, (i64, i64)>,
    /// trigger id -> timestamps of recorded state-change events
    event_counts: AHashMap<String, Vec<i64>>,
    /// notification queue, keyed by (target timestamp, insertion sequence)
    /// so that a BTreeMap scan visits equal-timestamp entries in enqueue order
    notifications: std::collections::BTreeMap<(i64, u64), ScheduledNotification>,
    registered_notifiers: AHashSet<String>,
}

/// An in-memory `Store`, suitable both as the default backend and as a
/// deterministic test fixture.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    notification_seq: Arc<AtomicU64>,
    metrics_count: Arc<AtomicU64>,
    checks_count: Arc<AtomicU64>,
    event_tx: mpsc::UnboundedSender<Event>,
    event_rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<Event>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            notification_seq: Arc::new(AtomicU64::new(0)),
            metrics_count: Arc::new(AtomicU64::new(0)),
            checks_count: Arc::new(AtomicU64::new(0)),
            event_tx,
            event_rx: Arc::new(AsyncMutex::new(event_rx)),
        }
    }

    pub fn put_trigger(&self, trigger: Trigger) {
        self.tables
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .triggers
            .insert(trigger.id.clone(), trigger);
    }

    pub fn put_contact(&self, contact: Contact) {
        self.tables
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contacts
            .insert(contact.id.clone(), contact);
    }

    pub fn put_subscription(&self, subscription: Subscription) {
        let mut tables = self
            .tables
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for tag in &subscription.tags {
            let ids = tables.tags_index.entry(tag.clone()).or_default();
            if !ids.contains(&subscription.id) {
                ids.push(subscription.id.clone());
            }
        }
        tables
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn fetch_event(&self, timeout: Duration) -> Option<Event> {
        let mut rx = self.event_rx.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }

    fn push_event(&self, event: Event) {
        self.metrics_count.fetch_add(1, Ordering::SeqCst);
        // An unbounded channel's send only fails once every receiver has
        // been dropped, i.e. the store itself is gone; nothing to recover.
        let _ = self.event_tx.send(event);
    }

    async fn get_trigger(&self, id: &str) -> Result<Trigger> {
        self.tables
            .read()?
            .triggers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "trigger",
                id: id.to_string(),
            })
    }

    async fn get_contact(&self, id: &str) -> Result<Contact> {
        self.tables
            .read()?
            .contacts
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "contact",
                id: id.to_string(),
            })
    }

    async fn get_subscription(&self, id: &str) -> Result<Subscription> {
        self.tables
            .read()?
            .subscriptions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "subscription",
                id: id.to_string(),
            })
    }

    async fn get_trigger_tags(&self, id: &str) -> Result<Vec<String>> {
        let tags = self.get_trigger(id).await?.tags;
        if tags.is_empty() {
            return Err(StoreError::EmptyTags(id.to_string()));
        }
        Ok(tags)
    }

    async fn get_tags_subscriptions(&self, tags: &[String]) -> Result<Vec<Subscription>> {
        let tables = self.tables.read()?;
        let mut seen = AHashSet::default();
        let mut result = Vec::new();
        for tag in tags {
            let Some(ids) = tables.tags_index.get(tag) else {
                continue;
            };
            for id in ids {
                if seen.insert(id.clone()) {
                    if let Some(subscription) = tables.subscriptions.get(id) {
                        result.push(subscription.clone());
                    }
                }
            }
        }
        Ok(result)
    }

    async fn add_notification(&self, notification: ScheduledNotification) -> Result<()> {
        let seq = self.notification_seq.fetch_add(1, Ordering::SeqCst);
        self.tables
            .write()?
            .notifications
            .insert((notification.timestamp, seq), notification);
        Ok(())
    }

    async fn get_notifications(&self, upto: i64) -> Result<Vec<ScheduledNotification>> {
        let mut tables = self.tables.write()?;
        // BTreeMap::split_off returns everything >= key; the due slice is
        // everything strictly before that, which we then swap back in as
        // the remainder.
        let remainder = tables.notifications.split_off(&(upto + 1, 0));
        let due = std::mem::replace(&mut tables.notifications, remainder);
        Ok(due.into_values().collect())
    }

    async fn get_trigger_throttling_timestamps(&self, trigger_id: &str) -> Result<(i64, i64)> {
        Ok(self
            .tables
            .read()?
            .throttling
            .get(trigger_id)
            .copied()
            .unwrap_or((0, 0)))
    }

    async fn set_trigger_throttling_timestamp(
        &self,
        trigger_id: &str,
        next_allowed: i64,
    ) -> Result<()> {
        // Only `next_allowed` is persisted; `throttling_beginning` has no
        // writer in this store, same as the upstream key it mirrors, so it
        // reads back as 0 forever and the `next_allowed >= beginning`
        // invariant holds trivially.
        self.tables
            .write()?
            .throttling
            .entry(trigger_id.to_string())
            .or_insert((0, 0))
            .0 = next_allowed;
        Ok(())
    }

    fn record_trigger_event(&self, trigger_id: &str, timestamp: i64) {
        self.tables
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .event_counts
            .entry(trigger_id.to_string())
            .or_default()
            .push(timestamp);
    }

    async fn get_trigger_events_count(&self, trigger_id: &str, from: i64) -> Result<u64> {
        Ok(self
            .tables
            .read()?
            .event_counts
            .get(trigger_id)
            .map(|timestamps| timestamps.iter().filter(|&&ts| ts >= from).count() as u64)
            .unwrap_or(0))
    }

    async fn get_metrics_count(&self) -> Result<u64> {
        Ok(self.metrics_count.load(Ordering::SeqCst))
    }

    async fn get_checks_count(&self) -> Result<u64> {
        Ok(self.checks_count.load(Ordering::SeqCst))
    }

    fn record_check(&self) {
        self.checks_count.fetch_add(1, Ordering::SeqCst);
    }

    async fn register_notifier(&self, hostname: &str) -> Result<()> {
        self.tables
            .write()?
            .registered_notifiers
            .insert(hostname.to_string());
        Ok(())
    }

    async fn unregister_notifier(&self, hostname: &str) -> Result<()> {
        self.tables.write()?.registered_notifiers.remove(hostname);
        Ok(())
    }
}
