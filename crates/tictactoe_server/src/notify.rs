//! Player notifications: per-move reminders and periodic digests.
//!
//! Reminders are queued without waiting for delivery; a background worker
//! hands them to a [`Notifier`]. Delivery is best effort.

use derive_more::{Display, Error};
use derive_new::new;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// "Your move" notice for the player whose turn it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, new)]
pub struct Reminder {
    /// Name of the user to remind.
    pub recipient: String,
    /// Email of the user, if registered.
    pub email: Option<String>,
    /// Key of the game awaiting their move.
    pub game_key: String,
}

/// Summary of a user's games in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, new)]
pub struct Digest {
    /// Name of the user.
    pub user: String,
    /// Address the digest goes to.
    pub email: String,
    /// Keys of all their games in progress.
    pub game_keys: Vec<String>,
}

impl Digest {
    /// Number of games in progress.
    pub fn count(&self) -> usize {
        self.game_keys.len()
    }
}

/// Failure to queue a notification.
#[derive(Debug, Clone, Display, Error)]
#[display("Notification queue error: {}", message)]
pub struct QueueError {
    /// Error message.
    pub message: String,
}

/// Accepts reminders for later delivery.
pub trait ReminderQueue: Clone + Send + Sync + 'static {
    /// Queues a reminder without waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] if the queue no longer accepts work.
    fn enqueue(&self, reminder: Reminder) -> Result<(), QueueError>;
}

/// Delivers notifications to users.
pub trait Notifier: Send + Sync + 'static {
    /// Delivers a reminder.
    fn send_reminder(&self, reminder: &Reminder);

    /// Delivers a digest.
    fn send_digest(&self, digest: &Digest);
}

/// Notifier that records deliveries in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_reminder(&self, reminder: &Reminder) {
        info!(
            recipient = %reminder.recipient,
            email = ?reminder.email,
            game_key = %reminder.game_key,
            "It's your turn"
        );
    }

    fn send_digest(&self, digest: &Digest) {
        info!(
            user = %digest.user,
            email = %digest.email,
            count = digest.count(),
            game_keys = %digest.game_keys.join(", "),
            "Games in progress digest"
        );
    }
}

/// Reminder queue backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelReminderQueue {
    sender: mpsc::UnboundedSender<Reminder>,
}

impl ChannelReminderQueue {
    /// Creates a queue and the receiving end to drain it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Reminder>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ReminderQueue for ChannelReminderQueue {
    #[instrument(skip(self), fields(recipient = %reminder.recipient, game_key = %reminder.game_key))]
    fn enqueue(&self, reminder: Reminder) -> Result<(), QueueError> {
        self.sender.send(reminder).map_err(|e| QueueError {
            message: format!("Reminder worker stopped: {}", e),
        })?;
        debug!("Reminder queued");
        Ok(())
    }
}

/// Spawns a worker delivering queued reminders until every sender is dropped.
pub fn spawn_reminder_worker<N: Notifier>(
    mut receiver: mpsc::UnboundedReceiver<Reminder>,
    notifier: N,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Reminder worker started");
        while let Some(reminder) = receiver.recv().await {
            notifier.send_reminder(&reminder);
        }
        warn!("Reminder worker stopped");
    })
}
