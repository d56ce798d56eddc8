//! The notification engine core: schedule evaluation, throttling, event
//! processing, dispatch, resend, and self-state monitoring, wired together
//! into one long-running service.

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod dispatcher;
pub mod error;
pub mod event_processor;
pub mod resend;
pub mod schedule;
pub mod self_state;
pub mod throttle;

use std::sync::Arc;
use std::time::Duration;

use moira_common::{Clock, NotificationPackage, Signal};
use moira_store::Store;
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, warn};

pub use dispatcher::SenderChannels;
pub use error::{NotifierError, ScheduleError};
pub use self_state::{SelfStateConfig, SelfStateMonitor};

/// How long a single `fetch_event` call blocks before returning `None` and
/// letting the service loop re-check the shutdown signal.
const EVENT_FETCH_TIMEOUT: Duration = Duration::from_secs(1);

/// How long the event-fetch loop backs off after a store error (§7 kind 1).
const EVENT_FETCH_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Configuration the service needs beyond what each component already takes.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub sender_timeout: Duration,
    pub resending_timeout: Duration,
}

/// The assembled notification engine: owns the store, clock, sender
/// channels, and self-state watchdog, and drives the three long-running
/// loops described in §5.
pub struct Notifier {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    senders: SenderChannels,
    admin_channel: UnboundedSender<NotificationPackage>,
    self_state: SelfStateMonitor,
    config: NotifierConfig,
}

impl Notifier {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        senders: SenderChannels,
        admin_channel: UnboundedSender<NotificationPackage>,
        self_state_config: SelfStateConfig,
        config: NotifierConfig,
    ) -> Self {
        let now = clock.now();
        Self {
            store,
            self_state: SelfStateMonitor::new(self_state_config, now),
            clock,
            senders,
            admin_channel,
            config,
        }
    }

    /// Run the event-fetch, dispatch, and self-state loops until `shutdown`
    /// fires. Each loop drains its current iteration before exiting.
    #[tracing::instrument(skip_all)]
    pub async fn serve(&self, mut shutdown: broadcast::Receiver<Signal>) -> anyhow::Result<()> {
        debug!("notifier starting");

        let mut dispatch_timer = tokio::time::interval(dispatcher::TICK_INTERVAL);
        let mut self_state_timer = tokio::time::interval(self_state::TICK_INTERVAL);
        dispatch_timer.tick().await;
        self_state_timer.tick().await;

        loop {
            tokio::select! {
                event = self.store.fetch_event(EVENT_FETCH_TIMEOUT) => {
                    if let Some(event) = event {
                        if let Err(error) = event_processor::process(self.store.as_ref(), self.clock.as_ref(), &event).await {
                            error!(%error, "failed to process event");
                            self.clock.sleep(EVENT_FETCH_RETRY_DELAY).await;
                        }
                    }
                }
                _ = dispatch_timer.tick() => {
                    dispatcher::dispatch_tick(
                        self.store.as_ref(),
                        self.clock.as_ref(),
                        &self.senders,
                        self.config.sender_timeout,
                        self.config.resending_timeout,
                    ).await;
                }
                _ = self_state_timer.tick() => {
                    self.self_state.tick(self.store.as_ref(), self.clock.as_ref(), &self.admin_channel).await;
                }
                signal = shutdown.recv() => {
                    match signal {
                        Ok(Signal::Shutdown) => {
                            debug!("notifier shutting down");
                            break;
                        }
                        Err(error) => {
                            warn!(%error, "shutdown channel error, stopping notifier");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
