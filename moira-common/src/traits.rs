//! The `Sender` contract (§4.6, §6) every notification channel implements.
//!
//! A sender owns one `contact.type` (`"mail"`, `"slack"`, `"telegram"`, ...).
//! The dispatcher resolves a package's contact type to a registered sender
//! and hands it the whole package in one call; the sender is responsible for
//! turning that into whatever its transport needs (an email, a chat message,
//! an SMS) and reporting success or failure.

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::model::NotificationPackage;

/// A single notification channel, registered under one `contact.type`.
///
/// Implementors are expected to be cheap to clone (an `Arc`-wrapped client)
/// since the registry hands out one instance per worker task.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Validate and apply this sender's section of the configuration.
    ///
    /// Called once at startup, before the sender is registered and before
    /// any package reaches it. `settings` is the sender's own config
    /// sub-table as raw JSON so each sender can define its own shape.
    async fn init(&mut self, settings: serde_json::Value) -> Result<(), ConfigError>;

    /// Deliver one package. Errors are the dispatcher's cue to apply the
    /// resend policy (§4.6); they are not logged as fatal here.
    async fn send_package(
        &self,
        package: &NotificationPackage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// The `contact.type` this sender answers to, e.g. `"mail"`.
    fn contact_type(&self) -> &str;
}
