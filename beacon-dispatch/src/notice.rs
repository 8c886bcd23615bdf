use std::borrow::Cow;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// A transient message shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    message: Cow<'static, str>,
    expires_at: Instant,
}

impl Notice {
    /// Returns the text of the notice.
    pub fn message(&self) -> &str {
        &self.message
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Holds at most one [`Notice`] that expires after a fixed time.
///
/// Posting a new notice replaces the current one and restarts its timer.
#[derive(Debug)]
pub struct NoticeBoard {
    ttl: Duration,
    current: Mutex<Option<Notice>>,
}

impl NoticeBoard {
    /// Creates an empty board whose notices live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: Mutex::new(None),
        }
    }

    /// Returns how long a notice is shown.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Shows a notice, replacing the current one.
    pub fn post(&self, message: impl Into<Cow<'static, str>>) {
        let notice = Notice {
            message: message.into(),
            expires_at: Instant::now() + self.ttl,
        };
        *self.current.lock() = Some(notice);
    }

    /// Returns the current notice unless it has expired.
    ///
    /// Expired notices are discarded.
    pub fn current(&self) -> Option<Notice> {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|n| n.is_expired(Instant::now())) {
            *current = None;
        }
        current.clone()
    }

    /// Removes the current notice.
    pub fn dismiss(&self) {
        self.current.lock().take();
    }
}
