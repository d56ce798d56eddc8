//! Top-level configuration (§10): a single file, loaded by extension as
//! either RON or TOML, with every `Duration` field accepting a human
//! duration or the legacy `hh:mm` colon form.

use std::path::Path;
use std::time::Duration;

use moira_common::config::HumanDuration;
use moira_common::{Contact, ConfigError};
use moira_metrics::MetricsConfig;
use moira_notifier::SelfStateConfig;
use moira_senders::SenderConfig;
use moira_store::StoreConfig;
use serde::Deserialize;

fn default_front_uri() -> String {
    "http://localhost".to_string()
}

fn default_sender_timeout() -> HumanDuration {
    HumanDuration(Duration::from_secs(10))
}

fn default_resending_timeout() -> HumanDuration {
    HumanDuration(Duration::from_secs(24 * 3600))
}

/// The process's entire configuration, loaded from one RON or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,

    /// Base URI the dispatcher's notifications link back to (contact-facing,
    /// opaque to the core pipeline).
    #[serde(default = "default_front_uri")]
    pub front_uri: String,

    /// Bounds a single package hand-off to its sender channel.
    #[serde(default = "default_sender_timeout")]
    pub sender_timeout: HumanDuration,

    /// Bounds a package's total resend lifetime; accepts the legacy `hh:mm`
    /// colon form in addition to a plain human duration.
    #[serde(default = "default_resending_timeout")]
    pub resending_timeout: HumanDuration,

    #[serde(default)]
    pub senders: Vec<SenderConfig>,

    #[serde(default)]
    pub self_state: SelfStateSection,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_self_state_enabled() -> bool {
    true
}

fn default_redis_disconnect_delay() -> HumanDuration {
    HumanDuration(Duration::from_secs(30))
}

fn default_last_metric_received_delay() -> HumanDuration {
    HumanDuration(Duration::from_secs(60))
}

fn default_last_check_delay() -> HumanDuration {
    HumanDuration(Duration::from_secs(120))
}

fn default_notice_interval() -> HumanDuration {
    HumanDuration(Duration::from_secs(300))
}

/// The self-state watchdog's configuration section (§4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct SelfStateSection {
    #[serde(default = "default_self_state_enabled")]
    pub enabled: bool,

    #[serde(default = "default_redis_disconnect_delay")]
    pub redis_disconnect_delay: HumanDuration,

    #[serde(default = "default_last_metric_received_delay")]
    pub last_metric_received_delay: HumanDuration,

    #[serde(default = "default_last_check_delay")]
    pub last_check_delay: HumanDuration,

    #[serde(default = "default_notice_interval")]
    pub notice_interval: HumanDuration,

    #[serde(default)]
    pub admin_contacts: Vec<Contact>,
}

impl Default for SelfStateSection {
    fn default() -> Self {
        Self {
            enabled: default_self_state_enabled(),
            redis_disconnect_delay: default_redis_disconnect_delay(),
            last_metric_received_delay: default_last_metric_received_delay(),
            last_check_delay: default_last_check_delay(),
            notice_interval: default_notice_interval(),
            admin_contacts: Vec::new(),
        }
    }
}

impl SelfStateSection {
    #[must_use]
    pub fn into_notifier_config(self) -> SelfStateConfig {
        SelfStateConfig {
            enabled: self.enabled,
            redis_disconnect_delay: self.redis_disconnect_delay.as_duration(),
            last_metric_received_delay: self.last_metric_received_delay.as_duration(),
            last_check_delay: self.last_check_delay.as_duration(),
            notice_interval: self.notice_interval.as_duration(),
            admin_contacts: self.admin_contacts,
        }
    }
}

/// Logging configuration; `level` overrides `LOG_LEVEL` and the
/// build-profile default when set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>,
}

/// Load configuration from `path`, dispatching on file extension: `.toml`
/// parses as TOML, anything else (including `.ron`) parses as RON.
///
/// # Errors
/// Returns [`ConfigError::Read`] if the file can't be read, or
/// [`ConfigError::Parse`] if its contents don't match the expected format.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    if path.extension().and_then(std::ffi::OsStr::to_str) == Some("toml") {
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source: Box::new(source),
        })
    } else {
        ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source: Box::new(source),
        })
    }
}
