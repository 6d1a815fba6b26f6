//! Notification collaborator
//!
//! Fire-and-forget by contract: a notification failure is logged and
//! swallowed, never propagated to whatever triggered it. The portal ships a
//! log-backed notifier and a webhook notifier; embedders can provide their
//! own by implementing `Notifier`.

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub component: String,
    pub description: String,
    pub action_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_description: Option<String>,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        component: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            level,
            title: title.into(),
            component: component.into(),
            description: description.into(),
            action_required: false,
            action_description: None,
        }
    }

    pub fn with_action(mut self, description: impl Into<String>) -> Self {
        self.action_required = true;
        self.action_description = Some(description.into());
        self
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification. Implementations must swallow their own
    /// failures; callers never handle delivery errors.
    async fn notify(&self, notification: Notification);
}

/// Default sink: the notification lands in the log at a severity matching
/// its level.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) {
        let line = format!(
            "[{}] {}: {}",
            notification.component, notification.title, notification.description
        );
        match notification.level {
            NotificationLevel::Info => log::info!("{}", line),
            NotificationLevel::Warning => log::warn!("{}", line),
            NotificationLevel::Critical => log::error!("{}", line),
        }
    }
}

/// POSTs the notification as JSON to a configured webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: Notification) {
        let result = self
            .client
            .post(&self.url)
            .json(&notification)
            .send()
            .await;

        match result {
            Ok(resp) if !resp.status().is_success() => {
                log::warn!(
                    "Notification webhook returned {} for '{}'",
                    resp.status(),
                    notification.title
                );
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("Notification webhook failed for '{}': {}", notification.title, e);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_action_sets_both_fields() {
        let n = Notification::new(
            NotificationLevel::Critical,
            "Backup failed",
            "backup",
            "payload write error",
        )
        .with_action("Re-run the backup from the admin panel");

        assert!(n.action_required);
        assert!(n.action_description.is_some());
    }

    #[test]
    fn test_notification_serializes_camel_case() {
        let n = Notification::new(NotificationLevel::Info, "t", "c", "d");
        let json = serde_json::to_string(&n).expect("serialize");
        assert!(json.contains("actionRequired"));
        assert!(!json.contains("action_required"));
    }

    #[tokio::test]
    async fn test_log_notifier_accepts_all_levels() {
        let notifier = LogNotifier;
        for level in [
            NotificationLevel::Info,
            NotificationLevel::Warning,
            NotificationLevel::Critical,
        ] {
            notifier
                .notify(Notification::new(level, "title", "component", "description"))
                .await;
        }
    }
}
