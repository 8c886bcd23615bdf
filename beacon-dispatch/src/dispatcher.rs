use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use beacon_client::{ClientSlot, ErrorPayload, EventKind, Level, Payload};
use parking_lot::Mutex;

use crate::guard::TokenGuard;
use crate::history::EventHistory;
use crate::record::EventRecord;

/// Message of the sample exception.
pub const EXCEPTION_MESSAGE: &str = "Test exception from demo app";

/// Result of a single dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The send resolved and the record was added to the history.
    Recorded(EventRecord),
    /// No access token is configured. A notice has been posted.
    Blocked,
    /// Another dispatch is still in flight. The trigger was dropped.
    Busy,
    /// The client failed internally. Nothing was recorded.
    Failed,
}

fn sample_payload(kind: EventKind) -> Payload {
    match kind {
        EventKind::Log(level) => {
            Payload::Message(format!("{} message from demo app", level.title()))
        }
        EventKind::Exception => Payload::Error(ErrorPayload::new("Error", EXCEPTION_MESSAGE)),
    }
}

/// Marks a dispatch as in flight for as long as it lives.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends sample events and keeps their history.
///
/// At most one dispatch is in flight at a time.
#[derive(Debug)]
pub struct Dispatcher {
    slot: Arc<ClientSlot>,
    guard: TokenGuard,
    history: Mutex<EventHistory>,
    busy: AtomicBool,
}

impl Dispatcher {
    /// Creates a dispatcher with an empty history.
    pub fn new(slot: Arc<ClientSlot>, guard: TokenGuard) -> Self {
        Self {
            slot,
            guard,
            history: Mutex::new(EventHistory::new()),
            busy: AtomicBool::new(false),
        }
    }

    /// Returns `true` while a dispatch is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Returns a snapshot of the history, newest first.
    pub fn history(&self) -> EventHistory {
        self.history.lock().clone()
    }

    /// Sends the sample message for `level`.
    pub async fn send_log(&self, level: Level) -> Dispatch {
        self.send(EventKind::Log(level)).await
    }

    /// Sends the sample exception.
    pub async fn send_exception(&self) -> Dispatch {
        self.send(EventKind::Exception).await
    }

    /// Sends the sample event of the given kind.
    pub async fn send(&self, kind: EventKind) -> Dispatch {
        self.dispatch(kind, sample_payload(kind)).await
    }

    /// Sends an event and records its outcome.
    pub async fn dispatch(&self, kind: EventKind, payload: Payload) -> Dispatch {
        if self.is_busy() {
            beacon_log::debug!(%kind, "dispatch in flight, dropping trigger");
            return Dispatch::Busy;
        }

        if !self.guard.check(kind.as_str()) {
            return Dispatch::Blocked;
        }

        let Some(_in_flight) = InFlight::acquire(&self.busy) else {
            beacon_log::debug!(%kind, "dispatch in flight, dropping trigger");
            return Dispatch::Busy;
        };

        match self.slot.send(kind, payload).await {
            Ok(outcome) => {
                if outcome.is_success() {
                    beacon_log::info!(
                        %kind,
                        remote_id = outcome.remote_id.as_deref(),
                        status = outcome.status,
                        "event dispatched"
                    );
                } else {
                    beacon_log::warn!(
                        %kind,
                        status = outcome.status,
                        "event rejected by the monitoring service"
                    );
                }

                let record = EventRecord::new(kind, outcome);
                self.history.lock().prepend(record.clone());
                Dispatch::Recorded(record)
            }
            Err(error) => {
                beacon_log::error!(
                    %kind,
                    error = &error as &dyn Error,
                    "failed to dispatch event"
                );
                Dispatch::Failed
            }
        }
    }
}
