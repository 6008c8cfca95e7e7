//! Fan-out of user-visible notifications.
//!
//! [`Notifier`] wraps a `tokio::sync::broadcast` channel so any number
//! of presentation layers can independently render every
//! [`Notification`].

use tokio::sync::broadcast;

use editkit_core::notification::{Notification, Severity};

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Notifier {
    /// When the buffer is full, the oldest unread notifications are
    /// dropped and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently when nobody
    /// is listening.
    pub fn notify(&self, notification: Notification) {
        tracing::debug!(
            severity = ?notification.severity,
            message = %notification.message,
            "Notification",
        );
        let _ = self.sender.send(notification);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(Notification::new(Severity::Success, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(Notification::new(Severity::Error, message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(Notification::new(Severity::Info, message));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_each_notification() {
        let notifier = Notifier::default();
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.subscribe();

        notifier.error("decode error");

        let n1 = rx1.recv().await.expect("subscriber 1 should receive");
        let n2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(n1.severity, Severity::Error);
        assert_eq!(n2.message, "decode error");
    }

    #[test]
    fn notify_without_subscribers_does_not_panic() {
        Notifier::default().info("nobody listening");
    }
}
