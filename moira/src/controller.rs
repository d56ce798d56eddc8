//! Top-level wiring: build the store, sender pool, and notifier from
//! configuration, then run them until a shutdown signal arrives.

use std::sync::{Arc, LazyLock};

use moira_common::traits::Sender;
use moira_common::{Clock, ConfigError, Signal, SystemClock};
use moira_notifier::{Notifier, NotifierConfig, SenderChannels};
use moira_senders::{LogSender, SenderConfig, SenderPool};
use moira_store::Store;
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::config::{Config, SelfStateSection};

/// Process-wide shutdown broadcast; every long-running loop subscribes its
/// own receiver and the main thread sends once, on ctrl-c or SIGTERM.
pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

/// Race ctrl-c against SIGTERM, then broadcast the shutdown signal and wait
/// for every subscriber to drain.
#[tracing::instrument]
pub async fn wait_for_shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down (press again to force)");
        }
        _ = terminate.recv() => {
            info!("terminate signal received, shutting down");
        }
    }

    let mut receiver = SHUTDOWN_BROADCAST.subscribe();
    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|error| anyhow::anyhow!("shutdown broadcast has no subscribers: {error}"))?;

    loop {
        tokio::select! {
            signal = receiver.recv() => {
                match signal {
                    Ok(s) => debug!(?s, "shutdown broadcast echoed"),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(error) => debug!(%error, "shutdown receiver error"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Build one `LogSender`-backed channel per configured entry.
///
/// Real transport bodies (SMTP, chat, process exec) are external
/// collaborators; every configured sender is wired to the reference log
/// sender, which reports every package as delivered.
fn configured_senders(config: &Config) -> Vec<(SenderConfig, Box<dyn Sender>)> {
    config
        .senders
        .iter()
        .cloned()
        .map(|sender_config| {
            let kind = sender_config.kind.clone();
            let sender: Box<dyn Sender> = Box::new(LogSender::new(kind));
            (sender_config, sender)
        })
        .collect()
}

/// Check that every self-state admin contact names a registered sender
/// channel and carries a non-empty value.
///
/// Mirrors the original's startup-time `CheckSelfStateMonitorSettings`:
/// an admin contact pointing at a sender that doesn't exist would
/// otherwise only surface as a dropped alert at alarm time.
///
/// # Errors
/// Returns [`ConfigError::UnknownAdminContactType`] if a contact's `type`
/// has no matching registered channel, or [`ConfigError::MissingField`]
/// if a contact has an empty value.
fn check_self_state_contacts(self_state: &SelfStateSection, senders: &SenderChannels) -> Result<(), ConfigError> {
    if !self_state.enabled {
        return Ok(());
    }

    for contact in &self_state.admin_contacts {
        if !senders.contains_key(&contact.kind) {
            return Err(ConfigError::UnknownAdminContactType(contact.kind.clone()));
        }
        if contact.value.is_empty() {
            return Err(ConfigError::MissingField("self_state.admin_contacts[].value"));
        }
    }

    Ok(())
}

/// Load and wire the configuration without starting any long-running loop.
///
/// Used by `--validate-config`: exercises config parsing, duplicate-key
/// detection, every sender's `init`, and the self-state admin contact
/// check the same way `run` would.
///
/// # Errors
/// Returns an error if any sender fails to register, or if a self-state
/// admin contact names an unregistered sender type or an empty value.
pub async fn validate(config: &Config) -> anyhow::Result<()> {
    let (_pool, senders) = SenderPool::build(configured_senders(config)).await?;
    check_self_state_contacts(&config.self_state, &senders)?;
    Ok(())
}

/// The assembled service: owns its configuration until `run` consumes it.
pub struct Moira {
    config: Config,
}

impl Moira {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the notifier, the sender pool, and the self-state admin
    /// forwarder until `shutdown` fires.
    ///
    /// # Errors
    /// Returns an error if a sender fails to register or the notifier loop
    /// exits abnormally.
    pub async fn run(self, shutdown: broadcast::Sender<Signal>) -> anyhow::Result<()> {
        moira_metrics::init_metrics(&self.config.metrics)?;

        let store: Arc<dyn Store> = Arc::new(self.config.store.build());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let hostname = hostname::get()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        if let Err(error) = store.register_notifier(&hostname).await {
            warn!(%error, %hostname, "failed to register this notifier host, continuing anyway");
        }

        let (sender_pool, senders) = SenderPool::build(configured_senders(&self.config)).await?;
        check_self_state_contacts(&self.config.self_state, &senders)?;

        let (admin_tx, admin_rx) = tokio::sync::mpsc::unbounded_channel();

        let notifier_config = NotifierConfig {
            sender_timeout: self.config.sender_timeout.as_duration(),
            resending_timeout: self.config.resending_timeout.as_duration(),
        };
        let resending_timeout = notifier_config.resending_timeout;

        let notifier = Notifier::new(
            store.clone(),
            clock.clone(),
            senders.clone(),
            admin_tx,
            self.config.self_state.into_notifier_config(),
            notifier_config,
        );

        info!("moira starting");

        let (notifier_result, (), ()) = tokio::join!(
            notifier.serve(shutdown.subscribe()),
            forward_admin_alerts(admin_rx, &senders, shutdown.subscribe()),
            sender_pool.run(store.as_ref(), clock.as_ref(), resending_timeout, &shutdown),
        );

        if let Err(error) = store.unregister_notifier(&hostname).await {
            warn!(%error, %hostname, "failed to unregister this notifier host");
        }

        info!("moira stopped");
        notifier_result
    }
}

/// Forward self-state admin packages to their contact's sender channel.
///
/// The self-state monitor pushes every admin contact's package onto one
/// shared channel regardless of contact type; this loop is the fan-out back
/// into the per-type channels the sender pool actually reads from.
async fn forward_admin_alerts(
    mut admin_rx: UnboundedReceiver<moira_common::NotificationPackage>,
    senders: &moira_notifier::SenderChannels,
    mut shutdown: broadcast::Receiver<Signal>,
) {
    loop {
        tokio::select! {
            package = admin_rx.recv() => {
                let Some(package) = package else { break };
                match senders.get(&package.contact.kind) {
                    Some(channel) => {
                        if channel.send(package).await.is_err() {
                            warn!("sender channel closed while forwarding a self-state alert");
                        }
                    }
                    None => warn!(
                        contact_type = %package.contact.kind,
                        "no sender registered for self-state admin contact type"
                    ),
                }
            }
            signal = shutdown.recv() => {
                match signal {
                    Ok(Signal::Shutdown) => break,
                    Err(_) => break,
                }
            }
        }
    }
}
