use std::sync::Arc;

use beacon_client::store::LocalStore;
use beacon_client::{ClientSlot, Connector};
use beacon_config::Config;

use crate::dispatcher::Dispatcher;
use crate::guard::TokenGuard;
use crate::notice::NoticeBoard;
use crate::settings::TokenSettings;
use crate::toggle::RecordingToggle;

/// Everything a user interacts with during one session.
///
/// All parts share the same monitoring client. Reinitializing it keeps the event history.
#[derive(Debug)]
pub struct Session {
    slot: Arc<ClientSlot>,
    notices: Arc<NoticeBoard>,
    dispatcher: Dispatcher,
    recording: RecordingToggle,
    settings: TokenSettings,
}

impl Session {
    /// Creates a session.
    ///
    /// The monitoring client is not constructed until it is first needed.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn LocalStore>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let notices = Arc::new(NoticeBoard::new(config.notice_ttl()));
        let slot = Arc::new(ClientSlot::new(config, store, connector));
        let guard = TokenGuard::new(slot.resolver().clone(), notices.clone());

        Self {
            dispatcher: Dispatcher::new(slot.clone(), guard.clone()),
            recording: RecordingToggle::new(slot.clone(), guard),
            settings: TokenSettings::new(slot.clone()),
            slot,
            notices,
        }
    }

    /// Returns the holder of the monitoring client.
    pub fn slot(&self) -> &Arc<ClientSlot> {
        &self.slot
    }

    /// Returns the board of transient notices.
    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Returns the event dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the session recording switch.
    pub fn recording(&self) -> &RecordingToggle {
        &self.recording
    }

    /// Returns the token settings.
    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use beacon_client::Level;
    use beacon_client::store::MemoryStore;
    use beacon_client::testutils::{MockConnector, MockTransport};

    use super::*;
    use crate::dispatcher::Dispatch;
    use crate::toggle::Toggle;

    fn session() -> (Session, Arc<MockConnector>) {
        let config = Config::from_json_value(serde_json::json!({
            "beacon": {"fallback_token": null},
            "session": {"notice_ttl": 1000}
        }))
        .unwrap();
        let connector = Arc::new(MockConnector::new(Arc::new(MockTransport::new())));
        let session = Session::new(
            Arc::new(config),
            Arc::new(MemoryStore::new()),
            connector.clone(),
        );
        (session, connector)
    }

    #[tokio::test]
    async fn test_history_survives_reinitialization() {
        let (session, connector) = session();
        assert_eq!(session.notices().ttl(), Duration::from_millis(1000));

        assert_eq!(
            session.dispatcher().send_log(Level::Info).await,
            Dispatch::Blocked
        );
        assert_eq!(session.recording().toggle(), Toggle::Blocked);
        assert!(session.settings().token_banner());

        session.settings().save_token("token").unwrap();
        assert!(matches!(
            session.dispatcher().send_exception().await,
            Dispatch::Recorded(_)
        ));

        assert_eq!(
            session.recording().toggle(),
            Toggle::Applied { active: true }
        );
        assert!(session.slot().client().unwrap().is_recording());

        session.settings().clear_token().unwrap();
        session.settings().save_token("other").unwrap();
        assert!(matches!(
            session.dispatcher().send_log(Level::Debug).await,
            Dispatch::Recorded(_)
        ));

        assert_eq!(session.dispatcher().history().len(), 2);
        assert_eq!(connector.connects(), 2);
        // The recording preference is picked up by the rebuilt client.
        assert!(session.slot().client().unwrap().is_recording());
    }
}
