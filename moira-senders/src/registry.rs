//! Sender registration and the worker pool that drains each sender's
//! channel (§4.5).
//!
//! The dispatcher only hands packages off to a channel; actually calling
//! the sender and applying the resend policy on failure happens here, in
//! the consuming worker, one per registered channel.

use std::time::Duration;

use futures_util::future::join_all;
use moira_common::traits::Sender;
use moira_common::{Clock, NotificationPackage, Signal};
use moira_notifier::dispatcher::CHANNEL_CAPACITY;
use moira_notifier::{resend::resend, SenderChannels};
use moira_store::Store;
use tokio::sync::broadcast;
use tokio::sync::mpsc::{self, Receiver};
use tracing::{debug, info, warn};

use crate::config::SenderConfig;
use crate::error::SenderError;

struct RegisteredSender {
    channel_key: String,
    sender: Box<dyn Sender>,
    receiver: Receiver<NotificationPackage>,
}

/// Initialized senders, ready to run their worker loops.
///
/// Built once at startup via [`SenderPool::build`], which also hands back
/// the [`SenderChannels`] map the dispatcher routes packages through.
pub struct SenderPool {
    workers: Vec<RegisteredSender>,
}

impl SenderPool {
    /// Initialize every configured sender and build its channel.
    ///
    /// Fails fast on a duplicate channel key or any sender's `init` error,
    /// matching the "configuration is fatal at startup" policy.
    ///
    /// # Errors
    /// Returns [`SenderError::DuplicateChannelKey`] if two senders resolve
    /// to the same channel key, or [`SenderError::Config`] if a sender's
    /// `init` rejects its settings.
    pub async fn build(
        configured: Vec<(SenderConfig, Box<dyn Sender>)>,
    ) -> Result<(Self, SenderChannels), SenderError> {
        let mut workers = Vec::with_capacity(configured.len());
        let mut channels = SenderChannels::new();

        for (config, mut sender) in configured {
            let key = config.channel_key();
            if channels.contains_key(&key) {
                return Err(SenderError::DuplicateChannelKey(key));
            }

            sender.init(config.settings).await?;

            let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
            channels.insert(key.clone(), tx);
            workers.push(RegisteredSender {
                channel_key: key,
                sender,
                receiver: rx,
            });
        }

        Ok((Self { workers }, channels))
    }

    /// Run every sender's worker loop until `shutdown` fires, draining each
    /// channel's remaining backlog before returning.
    pub async fn run(
        self,
        store: &dyn Store,
        clock: &dyn Clock,
        resending_timeout: Duration,
        shutdown: &broadcast::Sender<Signal>,
    ) {
        join_all(self.workers.into_iter().map(|worker| {
            worker_loop(worker, store, clock, resending_timeout, shutdown.subscribe())
        }))
        .await;
    }
}

async fn worker_loop(
    mut worker: RegisteredSender,
    store: &dyn Store,
    clock: &dyn Clock,
    resending_timeout: Duration,
    mut shutdown: broadcast::Receiver<Signal>,
) {
    info!(channel_key = %worker.channel_key, "sender worker starting");

    loop {
        tokio::select! {
            package = worker.receiver.recv() => {
                let Some(package) = package else {
                    debug!(channel_key = %worker.channel_key, "sender channel closed");
                    break;
                };
                deliver(worker.sender.as_ref(), &worker.channel_key, store, clock, resending_timeout, package).await;
            }
            signal = shutdown.recv() => {
                match signal {
                    Ok(Signal::Shutdown) => {
                        debug!(channel_key = %worker.channel_key, "sender worker shutting down");
                        break;
                    }
                    Err(_) => break,
                }
            }
        }
    }

    worker.receiver.close();
    while let Ok(package) = worker.receiver.try_recv() {
        deliver(worker.sender.as_ref(), &worker.channel_key, store, clock, resending_timeout, package).await;
    }

    info!(channel_key = %worker.channel_key, "sender worker stopped");
}

async fn deliver(
    sender: &dyn Sender,
    channel_key: &str,
    store: &dyn Store,
    clock: &dyn Clock,
    resending_timeout: Duration,
    package: NotificationPackage,
) {
    match sender.send_package(&package).await {
        Ok(()) => moira_metrics::record_send_ok(channel_key),
        Err(error) => {
            warn!(%channel_key, %error, %package, "sender failed to deliver package, taking resend path");
            moira_metrics::record_send_failed(channel_key);
            resend(store, clock, package, resending_timeout).await;
        }
    }
}
