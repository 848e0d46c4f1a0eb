//! Transient user-facing notifications.

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

/// Fan-out of notifications to any number of listeners.
///
/// Publishing never blocks and never fails; with no listener the
/// notification is only logged. Slow listeners lose the oldest entries.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(32)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(message = %message, "Notification");
        self.publish(Level::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(message = %message, "Notification");
        self.publish(Level::Error, message);
    }

    fn publish(&self, level: Level, message: String) {
        // Err only means nobody is listening.
        let _ = self.tx.send(Notification { level, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listeners_receive_in_order() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.success("Blog deleted successfully!");
        notifier.error("Failed to delete blog. Please try again.");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.level, Level::Success);
        assert_eq!(first.message, "Blog deleted successfully!");
        assert_eq!(rx.recv().await.unwrap().level, Level::Error);
    }

    #[test]
    fn publishing_without_listeners_is_fine() {
        Notifier::new(0).success("ok");
    }
}
