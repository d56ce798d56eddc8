//! Per-sender configuration (§6): one entry per registered channel.

use serde::Deserialize;

/// One configured sender: its channel key plus the settings sub-table
/// handed to `Sender::init` verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct SenderConfig {
    /// The contact type this sender answers to (`"mail"`, `"slack"`,
    /// `"script"`, ...).
    #[serde(rename = "type")]
    pub kind: String,

    /// Distinguishes multiple script senders sharing `kind == "script"`.
    /// Any other sender leaves this `None` and registers under `kind`.
    #[serde(default)]
    pub name: Option<String>,

    /// Front URI and channel-specific credentials, opaque to the registry.
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl SenderConfig {
    /// The key this sender is registered under in the channel map.
    #[must_use]
    pub fn channel_key(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.kind.clone())
    }
}
