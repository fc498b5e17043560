//! Fire-and-forget notification delivery.
//!
//! Complaint transitions hand [`Notification`] records to a [`Notifier`],
//! which pushes them onto an unbounded channel. A background task drains the
//! channel and persists each record. Neither a closed channel nor a failed
//! insert ever reaches the caller: both are logged and dropped, so the
//! primary state change always stands on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::Priority;
use crate::storage::Storage;

/// Kind of notification, used by clients to pick an icon and a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ComplaintUpdate,
    Emergency,
    Message,
    FeedbackRequest,
    Escalation,
}

/// The entity a notification points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEntity {
    pub entity_type: String,
    pub entity_id: String,
}

/// A follow-up the recipient is asked to take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationAction {
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub category: String,
    pub priority: Priority,
    pub related_entity: Option<RelatedEntity>,
    #[serde(default)]
    pub action_required: bool,
    #[serde(default)]
    pub action: Option<NotificationAction>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a normal-priority notification in the `sos` category.
    pub fn new(
        recipient: &str,
        title: &str,
        message: impl Into<String>,
        notification_type: NotificationType,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            recipient: recipient.to_string(),
            title: title.to_string(),
            message: message.into(),
            notification_type,
            category: "sos".to_string(),
            priority: Priority::Normal,
            related_entity: None,
            action_required: false,
            action: None,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn about_complaint(mut self, complaint_id: &str) -> Self {
        self.related_entity = Some(RelatedEntity {
            entity_type: "complaint".to_string(),
            entity_id: complaint_id.to_string(),
        });
        self
    }

    pub fn requiring(mut self, kind: &str, url: String) -> Self {
        self.action_required = true;
        self.action = Some(NotificationAction {
            kind: kind.to_string(),
            url,
        });
        self
    }
}

/// Handle for queueing notifications.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Start the delivery task that persists queued notifications.
    pub fn spawn(storage: Storage) -> (Self, JoinHandle<()>) {
        let (notifier, mut rx) = Self::channel();

        let handle = tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                match storage.insert_notification(&notification).await {
                    Ok(()) => debug!(
                        notification_id = %notification.id,
                        kind = ?notification.notification_type,
                        "Notification stored"
                    ),
                    Err(e) => warn!(
                        notification_id = %notification.id,
                        error = %e,
                        "Failed to store notification"
                    ),
                }
            }
            debug!("Notification channel closed");
        });

        (notifier, handle)
    }

    /// A notifier whose queue is handed straight back to the caller.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a notification. Never fails.
    pub fn notify(&self, notification: Notification) {
        if let Err(e) = self.tx.send(notification) {
            warn!(
                notification_id = %e.0.id,
                "Notification dropped, delivery task is gone"
            );
        }
    }
}

/// First 50 characters of a message, with an ellipsis when cut.
pub fn preview(message: &str) -> String {
    const PREVIEW_CHARS: usize = 50;

    let mut chars = message.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
