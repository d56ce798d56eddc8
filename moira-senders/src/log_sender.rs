//! A reference sender that logs what it would deliver instead of using a
//! real transport. Transport bodies (SMTP, HTTP, process exec) are external
//! collaborators; this is the stand-in used for local deployments, the
//! self-state admin channel in tests, and as a template for real senders.

use async_trait::async_trait;
use moira_common::traits::Sender;
use moira_common::{ConfigError, NotificationPackage};
use tracing::info;

/// Logs each package at `info` and always reports success.
#[derive(Debug, Default)]
pub struct LogSender {
    contact_type: String,
}

impl LogSender {
    #[must_use]
    pub fn new(contact_type: impl Into<String>) -> Self {
        Self {
            contact_type: contact_type.into(),
        }
    }
}

#[async_trait]
impl Sender for LogSender {
    async fn init(&mut self, _settings: serde_json::Value) -> Result<(), ConfigError> {
        Ok(())
    }

    async fn send_package(
        &self,
        package: &NotificationPackage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            contact_type = %self.contact_type,
            contact = %package.contact.value,
            trigger = %package.trigger.id,
            events = package.events.len(),
            throttled = package.throttled,
            "delivering package"
        );
        Ok(())
    }

    fn contact_type(&self) -> &str {
        &self.contact_type
    }
}

#[cfg(test)]
mod tests {
    use moira_common::{Contact, Trigger};

    use super::*;

    fn sample_package() -> NotificationPackage {
        NotificationPackage {
            events: vec![],
            trigger: Trigger::default(),
            contact: Contact {
                id: "contact-1".to_string(),
                kind: "mail".to_string(),
                value: "oncall@example.com".to_string(),
                user: String::new(),
            },
            throttled: false,
            fail_count: 0,
            do_not_resend: false,
        }
    }

    #[tokio::test]
    async fn send_package_always_succeeds() {
        let sender = LogSender::new("mail");
        assert!(sender.send_package(&sample_package()).await.is_ok());
    }

    #[tokio::test]
    async fn reports_its_contact_type() {
        let sender = LogSender::new("mail");
        assert_eq!(sender.contact_type(), "mail");
    }
}
