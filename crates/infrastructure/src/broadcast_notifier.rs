use async_trait::async_trait;
use issuetrail_application::{ChangeBroadcaster, ChangeNotification};
use tokio::sync::broadcast;

/// Change broadcaster over a `tokio::sync::broadcast` channel.
///
/// Fire-and-forget: publishing with no live subscribers is not an
/// error, and slow subscribers that lag past the channel capacity miss
/// notifications rather than slow down publishers.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ChangeNotification>,
}

impl BroadcastNotifier {
    /// Creates a notifier with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes one observer to future notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl ChangeBroadcaster for BroadcastNotifier {
    async fn publish(&self, notification: ChangeNotification) {
        // Err only means nobody is listening right now.
        let _ = self.sender.send(notification);
    }
}
