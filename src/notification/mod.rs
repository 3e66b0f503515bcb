//! Transient toast notifications.
//!
//! Every toast carries its own expiry deadline. The host loop calls
//! [`NotificationCenter::expire_due`] on each tick; a manual
//! [`NotificationCenter::dismiss`] drops the toast together with its deadline,
//! so both triggers end up in the same idempotent removal.

mod desktop;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::Clock;

pub use desktop::DesktopSink;

pub const DEFAULT_DISPLAY_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl NotificationId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub severity: Severity,
    pub created_at: Instant,
    pub expires_at: Instant,
}

/// Receives a copy of every pushed toast, e.g. to mirror it on the desktop.
pub trait NotificationSink: Send {
    fn deliver(&self, notification: &Notification);
}

pub struct NotificationCenter {
    clock: Arc<dyn Clock>,
    display_duration: Duration,
    next_id: u64,
    entries: Vec<Notification>,
    sink: Option<Box<dyn NotificationSink>>,
}

impl NotificationCenter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_duration(clock, DEFAULT_DISPLAY_DURATION)
    }

    pub fn with_duration(clock: Arc<dyn Clock>, display_duration: Duration) -> Self {
        Self {
            clock,
            display_duration,
            next_id: 1,
            entries: Vec::new(),
            sink: None,
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sink = Some(sink);
    }

    pub fn display_duration(&self) -> Duration {
        self.display_duration
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity) -> NotificationId {
        self.push_with_duration(message, severity, self.display_duration)
    }

    pub fn push_with_duration(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        duration: Duration,
    ) -> NotificationId {
        let id = NotificationId(self.next_id);
        self.next_id += 1;

        let created_at = self.clock.now();
        let notification = Notification {
            id,
            message: message.into(),
            severity,
            created_at,
            expires_at: created_at + duration,
        };
        tracing::debug!(
            id = id.get(),
            severity = severity.as_str(),
            message = %notification.message,
            "push notification"
        );

        if let Some(sink) = &self.sink {
            sink.deliver(&notification);
        }
        self.entries.push(notification);
        id
    }

    /// Returns `false` when the toast was already gone.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        self.remove(id)
    }

    /// Removes every toast whose deadline has passed and returns their ids.
    pub fn expire_due(&mut self) -> Vec<NotificationId> {
        let now = self.clock.now();
        if !self.next_deadline().is_some_and(|deadline| deadline <= now) {
            return Vec::new();
        }
        let due: Vec<NotificationId> = self
            .entries
            .iter()
            .filter(|entry| entry.expires_at <= now)
            .map(|entry| entry.id)
            .collect();
        for id in &due {
            self.remove(*id);
        }
        due
    }

    /// Earliest expiry among the live toasts.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|entry| entry.expires_at).min()
    }

    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, id: NotificationId) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        self.entries.remove(index);
        tracing::debug!(id = id.get(), "removed notification");
        true
    }
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("display_duration", &self.display_duration)
            .field("next_id", &self.next_id)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}
