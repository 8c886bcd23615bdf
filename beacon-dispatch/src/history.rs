use std::collections::VecDeque;

use crate::record::EventRecord;

/// The in-memory list of dispatched events, newest first.
///
/// The history only lives as long as the session and is never persisted.
#[derive(Clone, Debug, Default)]
pub struct EventHistory {
    records: VecDeque<EventRecord>,
}

impl EventHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record in front of all existing records.
    pub fn prepend(&mut self, record: EventRecord) {
        self.records.push_front(record);
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing has been dispatched yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the most recent record.
    pub fn latest(&self) -> Option<&EventRecord> {
        self.records.front()
    }

    /// Iterates records from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use beacon_client::{EventKind, Level, SendOutcome};

    use super::*;

    fn record(kind: EventKind) -> EventRecord {
        EventRecord::new(
            kind,
            SendOutcome {
                remote_id: None,
                status: 202,
            },
        )
    }

    #[test]
    fn test_newest_first() {
        let mut history = EventHistory::new();
        assert!(history.is_empty());

        let first = record(EventKind::Log(Level::Info));
        let second = record(EventKind::Exception);
        history.prepend(first.clone());
        history.prepend(second.clone());

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest(), Some(&second));
        let ids: Vec<_> = history.iter().map(EventRecord::id).collect();
        assert_eq!(ids, vec![second.id(), first.id()]);
    }
}
