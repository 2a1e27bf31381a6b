//! Ephemeral toast messages.

use std::time::{Duration, Instant};

/// A message that expires on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub expires_at: Instant,
}

/// Holds at most one toast; a new one replaces the old.
#[derive(Debug, Clone)]
pub struct Notifications {
    current: Option<Toast>,
    ttl: Duration,
}

impl Notifications {
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self { current: None, ttl }
    }

    pub fn show(&mut self, message: impl Into<String>, now: Instant) {
        let message = message.into();
        tracing::debug!(%message, "Toast");
        self.current = Some(Toast {
            message,
            expires_at: now + self.ttl,
        });
    }

    /// The toast visible at `now`, dropping it once expired.
    pub fn active(&mut self, now: Instant) -> Option<&str> {
        if self.current.as_ref().is_some_and(|t| now >= t.expires_at) {
            self.current = None;
        }
        self.current.as_ref().map(|t| t.message.as_str())
    }

    /// Take the current toast regardless of expiry.
    pub fn take(&mut self) -> Option<Toast> {
        self.current.take()
    }
}
