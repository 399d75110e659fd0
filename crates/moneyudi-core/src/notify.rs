//! Toast notifications.
//!
//! `NotificationBus` owns the list of visible toasts. Anything holding the
//! bus can post; views either read `active()` each frame or subscribe to a
//! broadcast receiver. Dropping the receiver unsubscribes.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{info, warn};

/// How long a toast stays visible
pub const NOTIFICATION_LIFETIME: Duration = Duration::from_secs(4);

/// Visible toasts kept at once; the oldest is dropped beyond this
pub const DEFAULT_CAPACITY: usize = 5;

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

impl NotificationKind {
    pub fn icon(self) -> &'static str {
        match self {
            NotificationKind::Success => "✅",
            NotificationKind::Error => "❌",
            NotificationKind::Info => "ℹ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub expires_at: Instant,
}

impl Notification {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct NotificationBus {
    queue: VecDeque<Notification>,
    capacity: usize,
    next_id: u64,
    sender: broadcast::Sender<Notification>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            next_id: 1,
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Post a toast at `now`; returns its id
    pub fn push(&mut self, message: impl Into<String>, kind: NotificationKind, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let notification = Notification {
            id,
            message: message.into(),
            kind,
            expires_at: now + NOTIFICATION_LIFETIME,
        };

        while self.queue.len() >= self.capacity {
            self.queue.pop_front();
        }
        self.queue.push_back(notification.clone());

        // No subscribers is fine
        let _ = self.sender.send(notification);
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.push(message, NotificationKind::Success, Instant::now())
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(message, NotificationKind::Error, Instant::now())
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.push(message, NotificationKind::Info, Instant::now())
    }

    /// Drop expired toasts; returns how many were removed
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.queue.len();
        self.queue.retain(|n| !n.is_expired_at(now));
        before - self.queue.len()
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.queue.len();
        self.queue.retain(|n| n.id != id);
        before != self.queue.len()
    }

    /// Oldest first
    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Write every posted toast to the log until the bus is dropped.
/// Returns how many were logged.
pub async fn log_notifications(mut rx: broadcast::Receiver<Notification>) -> usize {
    let mut logged = 0;
    loop {
        match rx.recv().await {
            Ok(n) => {
                match n.kind {
                    NotificationKind::Error => warn!(id = n.id, message = %n.message, "Toast"),
                    NotificationKind::Success | NotificationKind::Info => {
                        info!(id = n.id, message = %n.message, "Toast")
                    }
                }
                logged += 1;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Notification log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    logged
}
