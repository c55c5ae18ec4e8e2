//! Alerts emitted by sessions and monitors, and the bounded log that keeps them.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::settings::CameraId;

/// Unique alert identifier, increasing with creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlertId(u64);

impl AlertId {
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Error => write!(f, "error"),
        }
    }
}

/// A user-visible notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub camera: Option<CameraId>,
    pub level: AlertLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Shared source of alert ids.
///
/// Clones share one counter, so every emitter built from the same source
/// produces ids that are unique and ordered across camera slots.
#[derive(Debug, Clone)]
pub struct AlertIds {
    next: Arc<AtomicU64>,
}

impl Default for AlertIds {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertIds {
    pub fn new() -> Self {
        Self {
            next: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn next_id(&self) -> AlertId {
        AlertId(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

/// Emits alerts for one camera slot into an unbounded channel.
///
/// Emission never blocks and never fails; a closed receiver only means no
/// one is listening any more.
#[derive(Debug, Clone)]
pub struct AlertEmitter {
    camera: Option<CameraId>,
    ids: AlertIds,
    sender: mpsc::UnboundedSender<Alert>,
}

impl AlertEmitter {
    pub fn new(
        camera: Option<CameraId>,
        ids: AlertIds,
        sender: mpsc::UnboundedSender<Alert>,
    ) -> Self {
        Self {
            camera,
            ids,
            sender,
        }
    }

    /// Creates an emitter together with the receiving end of its channel.
    pub fn channel(
        camera: Option<CameraId>,
        ids: AlertIds,
    ) -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(camera, ids, sender), receiver)
    }

    pub fn emit(&self, level: AlertLevel, message: impl Into<String>) -> AlertId {
        let alert = Alert {
            id: self.ids.next_id(),
            camera: self.camera,
            level,
            message: message.into(),
            created_at: Utc::now(),
        };
        let id = alert.id;

        tracing::debug!(camera = ?self.camera, %level, "Alert {}: {}", id, alert.message);

        if self.sender.send(alert).is_err() {
            tracing::trace!("Alert {} dropped, no receiver", id);
        }
        id
    }

    pub fn info(&self, message: impl Into<String>) -> AlertId {
        self.emit(AlertLevel::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> AlertId {
        self.emit(AlertLevel::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> AlertId {
        self.emit(AlertLevel::Error, message)
    }
}

/// Bounded alert history, newest first.
///
/// Deleting or clearing entries only affects the log; it never reaches back
/// into the session that emitted them.
#[derive(Debug, Clone)]
pub struct AlertLog {
    capacity: usize,
    entries: VecDeque<Alert>,
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl AlertLog {
    pub const DEFAULT_CAPACITY: usize = 50;

    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Records an alert, dropping the oldest one when full.
    pub fn push(&mut self, alert: Alert) {
        self.entries.push_front(alert);
        self.entries.truncate(self.capacity);
    }

    /// Removes one alert. Returns false if it was not in the log.
    pub fn delete(&mut self, id: AlertId) -> bool {
        match self.entries.iter().position(|alert| alert.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Alert> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn to_vec(&self) -> Vec<Alert> {
        self.entries.iter().cloned().collect()
    }
}
