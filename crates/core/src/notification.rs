use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Clone, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            event_name = "notification.logged",
            to = %notification.to,
            subject = %notification.subject,
            body = %notification.body,
            "notification delivery is disabled; logged instead"
        );
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: bool,
}

impl RecordingNotifier {
    /// A notifier that rejects every delivery.
    pub fn failing() -> Self {
        Self { sent: Arc::default(), failing: true }
    }

    pub fn sent(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        if self.failing {
            return Err(NotificationError::Delivery("recording notifier set to fail".to_string()));
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification.clone()),
            Err(poisoned) => poisoned.into_inner().push(notification.clone()),
        }
        Ok(())
    }
}

pub fn cash_ready_notification(to: &str, owner_name: Option<&str>, title: &str) -> Notification {
    let owner = owner_name.filter(|name| !name.trim().is_empty()).unwrap_or("Applicant");
    Notification {
        to: to.to_string(),
        subject: format!("[Cash ready] {title}"),
        body: format!(
            "Dear {owner},\n\nThe cash for \"{title}\" has been prepared.\nPlease collect it at the school office.\n\n--- School Budget Flow"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{cash_ready_notification, Notifier, RecordingNotifier};

    #[test]
    fn cash_ready_message_names_owner_and_title() {
        let notification =
            cash_ready_notification("tanaka@example.com", Some("Tanaka"), "Festival supplies");

        assert_eq!(notification.subject, "[Cash ready] Festival supplies");
        assert!(notification.body.starts_with("Dear Tanaka,"));
        assert!(notification.body.contains("\"Festival supplies\""));
    }

    #[test]
    fn cash_ready_message_falls_back_to_generic_salutation() {
        let notification = cash_ready_notification("a@example.com", Some("  "), "Balls");
        assert!(notification.body.starts_with("Dear Applicant,"));
    }

    #[tokio::test]
    async fn recording_notifier_captures_or_fails() {
        let notifier = RecordingNotifier::default();
        let message = cash_ready_notification("a@example.com", None, "Balls");
        notifier.send(&message).await.expect("recorded");
        assert_eq!(notifier.sent(), vec![message.clone()]);

        let failing = RecordingNotifier::failing();
        assert!(failing.send(&message).await.is_err());
        assert!(failing.sent().is_empty());
    }
}
