use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use beacon_client::{ClientSlot, RecordingChange, store};

use crate::guard::TokenGuard;

/// Result of flipping the recording switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Toggle {
    /// No access token is configured. A notice has been posted and nothing changed.
    Blocked,
    /// The live client already reflects the new state.
    Applied {
        /// Whether recording is now on.
        active: bool,
    },
    /// The monitoring client was reinitialized to apply the new state.
    Reinitialized {
        /// Whether recording is now on.
        active: bool,
    },
    /// The preference could not be changed. The state is unchanged.
    Failed,
}

/// The user-facing session recording switch.
///
/// The switch state is read from the persisted preference once, when the toggle is created, and
/// afterwards only changes through [`toggle`](Self::toggle).
#[derive(Debug)]
pub struct RecordingToggle {
    slot: Arc<ClientSlot>,
    guard: TokenGuard,
    active: AtomicBool,
}

impl RecordingToggle {
    /// Creates the toggle from the persisted preference.
    pub fn new(slot: Arc<ClientSlot>, guard: TokenGuard) -> Self {
        let active = store::recording_enabled(slot.store().as_ref());
        Self {
            slot,
            guard,
            active: AtomicBool::new(active),
        }
    }

    /// Returns `true` if the switch is on.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Flips the switch.
    pub fn toggle(&self) -> Toggle {
        if !self.guard.check("replay") {
            return Toggle::Blocked;
        }

        let active = !self.is_active();
        let result = if active {
            self.slot.start_recording()
        } else {
            self.slot.stop_recording()
        };

        let change = match result {
            Ok(change) => change,
            Err(error) => {
                beacon_log::error!(
                    active,
                    error = &error as &dyn Error,
                    "failed to change session recording"
                );
                return Toggle::Failed;
            }
        };

        self.active.store(active, Ordering::Release);

        match change {
            RecordingChange::Applied => {
                beacon_log::info!(active, "session recording changed");
                Toggle::Applied { active }
            }
            RecordingChange::ReinitRequired => {
                self.slot.reinitialize();
                // Build the replacement right away so it picks up the new preference.
                if let Err(error) = self.slot.client() {
                    beacon_log::error!(
                        error = &error as &dyn Error,
                        "failed to reinitialize monitoring client"
                    );
                }
                beacon_log::info!(active, "session recording changed after reinitialization");
                Toggle::Reinitialized { active }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use beacon_client::store::{
        ACCESS_TOKEN_KEY, LocalStore, MemoryStore, RECORDING_ENABLED_KEY, StoreError,
    };
    use beacon_client::testutils::{MockConnector, MockTransport};
    use beacon_config::Config;

    use super::*;
    use crate::notice::NoticeBoard;

    fn toggle_with(store: Arc<dyn LocalStore>) -> (RecordingToggle, Arc<ClientSlot>, Arc<NoticeBoard>) {
        let connector = MockConnector::new(Arc::new(MockTransport::new()));
        toggle_connected(store, connector)
    }

    fn toggle_connected(
        store: Arc<dyn LocalStore>,
        connector: MockConnector,
    ) -> (RecordingToggle, Arc<ClientSlot>, Arc<NoticeBoard>) {
        beacon_log::init_test!();

        let config = Config::from_json_value(serde_json::json!({
            "beacon": {"fallback_token": null}
        }))
        .unwrap();
        let connector = Arc::new(connector);
        let slot = Arc::new(ClientSlot::new(Arc::new(config), store, connector));
        let notices = Arc::new(NoticeBoard::new(Duration::from_secs(3)));
        let guard = TokenGuard::new(slot.resolver().clone(), notices.clone());
        (RecordingToggle::new(slot.clone(), guard), slot, notices)
    }

    fn stored(entries: &[(&str, &str)]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (key, value) in entries {
            store.set(key, value).unwrap();
        }
        store
    }

    #[test]
    fn test_initial_state_from_store() {
        let store = stored(&[(ACCESS_TOKEN_KEY, "token"), (RECORDING_ENABLED_KEY, "true")]);
        let (toggle, _, _) = toggle_with(store);
        assert!(toggle.is_active());

        let store = stored(&[(RECORDING_ENABLED_KEY, "yes")]);
        let (toggle, _, _) = toggle_with(store);
        assert!(!toggle.is_active());
    }

    #[test]
    fn test_blocked_without_token() {
        let store = stored(&[]);
        let (toggle, slot, notices) = toggle_with(store.clone());

        assert_eq!(toggle.toggle(), Toggle::Blocked);
        assert!(!toggle.is_active());
        assert_eq!(store.get(RECORDING_ENABLED_KEY), None);
        assert!(!slot.is_initialized());
        assert!(notices.current().is_some());
    }

    #[test]
    fn test_start_applies_directly() {
        let store = stored(&[(ACCESS_TOKEN_KEY, "token")]);
        let (toggle, slot, _) = toggle_with(store.clone());
        let client = slot.client().unwrap();

        assert_eq!(toggle.toggle(), Toggle::Applied { active: true });
        assert!(toggle.is_active());
        assert!(client.is_recording());
        assert!(Arc::ptr_eq(&client, &slot.client().unwrap()));
        assert_eq!(store.get(RECORDING_ENABLED_KEY).as_deref(), Some("true"));
    }

    #[test]
    fn test_start_reinitializes_stale_client() {
        let store = stored(&[]);
        let (toggle, slot, _) = toggle_with(store.clone());
        let stale = slot.client().unwrap();
        store.set(ACCESS_TOKEN_KEY, "token").unwrap();

        assert_eq!(toggle.toggle(), Toggle::Reinitialized { active: true });
        let client = slot.client().unwrap();
        assert!(!Arc::ptr_eq(&stale, &client));
        assert!(client.is_enabled());
        assert!(client.is_recording());
    }

    #[test]
    fn test_stop_always_reinitializes() {
        let store = stored(&[(ACCESS_TOKEN_KEY, "token"), (RECORDING_ENABLED_KEY, "true")]);
        let (toggle, slot, _) = toggle_with(store.clone());
        let before = slot.client().unwrap();
        assert!(before.is_recording());

        assert_eq!(toggle.toggle(), Toggle::Reinitialized { active: false });
        assert!(!toggle.is_active());
        assert_eq!(store.get(RECORDING_ENABLED_KEY).as_deref(), Some("false"));
        assert!(!slot.client().unwrap().is_recording());
    }

    #[derive(Debug)]
    struct ReadOnlyStore(MemoryStore);

    impl LocalStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(read_only())
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(read_only())
        }
    }

    fn read_only() -> StoreError {
        StoreError::Io {
            path: "storage.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        }
    }

    #[test]
    fn test_persist_failure_keeps_state() {
        let inner = MemoryStore::new();
        inner.set(ACCESS_TOKEN_KEY, "token").unwrap();
        let (toggle, slot, _) = toggle_with(Arc::new(ReadOnlyStore(inner)));

        assert_eq!(toggle.toggle(), Toggle::Failed);
        assert!(!toggle.is_active());
        assert!(!slot.client().unwrap().is_recording());
    }

    #[test]
    fn test_connect_failure_keeps_preference() {
        let store = stored(&[(ACCESS_TOKEN_KEY, "token")]);
        let (toggle, slot, _) = toggle_connected(store.clone(), MockConnector::failing());

        assert_eq!(toggle.toggle(), Toggle::Failed);
        assert!(!toggle.is_active());
        assert!(!slot.is_initialized());
        assert_eq!(store.get(RECORDING_ENABLED_KEY), None);
        assert_eq!(toggle.is_active(), store::recording_enabled(store.as_ref()));
    }
}
