use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use beacon_config::Config;
use parking_lot::Mutex;
use url::Url;

use crate::credentials::{AccessToken, CredentialResolver};
use crate::protocol::{EventKind, Item, ItemResponse, Payload, SendOutcome};
use crate::store::{self, LocalStore, StoreError};
use crate::transport::{Connector, Transport};

/// Tag attached to recordings started from the recording toggle.
const MANUAL_START_TAG: &str = "manual-start";

/// An internal failure of the client.
///
/// Failures reported by the monitoring service are not client errors, see
/// [`TransportError`](crate::TransportError).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configured endpoint cannot be extended to the item API.
    #[error("invalid monitoring endpoint")]
    InvalidEndpoint(#[source] url::ParseError),
    /// The transport could not be constructed.
    #[error("failed to construct transport")]
    Connect(#[source] Box<dyn Error + Send + Sync + 'static>),
    /// The payload has nothing to report.
    #[error("refusing to send an empty {0} payload")]
    EmptyPayload(EventKind),
    /// The recording preference could not be persisted.
    #[error("failed to persist recording preference")]
    Store(#[from] StoreError),
}

/// Session recording settings of a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Whether the client carries the recording capability at all.
    pub enabled: bool,
    /// Whether recording starts as soon as the client is constructed.
    pub auto_start: bool,
}

/// Settings frozen into a [`MonitoringClient`] when it is constructed.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// The token the client submits with. Without a token, the client is disabled.
    pub access_token: Option<AccessToken>,
    /// The environment name attached to every item.
    pub environment: String,
    /// Base URL of the monitoring service.
    pub endpoint: Url,
    /// The code version attached to every item.
    pub code_version: String,
    /// Timeout for a single submission.
    pub timeout: Duration,
    /// Whether panics are reported automatically.
    pub capture_uncaught: bool,
    /// Whether failed background tasks are reported automatically.
    pub capture_unhandled_rejections: bool,
    /// Session recording settings.
    pub replay: ReplayOptions,
}

impl ClientOptions {
    /// Returns `true` if a client built from these options transmits items.
    pub fn enabled(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Session recording state of a client.
#[derive(Debug)]
struct Recorder {
    options: ReplayOptions,
    active: AtomicBool,
}

impl Recorder {
    fn new(options: ReplayOptions) -> Self {
        Self {
            options,
            active: AtomicBool::new(options.enabled && options.auto_start),
        }
    }
}

/// Capability of a client to start recording without being reconstructed.
#[derive(Debug)]
pub struct ReplayTrigger<'a> {
    recorder: &'a Recorder,
}

impl ReplayTrigger<'_> {
    /// Starts recording immediately, labeled with the given tags.
    pub fn trigger(&self, tags: &[&str]) {
        let was_active = self.recorder.active.swap(true, Ordering::Relaxed);
        beacon_log::info!(?tags, was_active, "triggered direct session recording");
    }
}

/// The client wrapping the monitoring transport.
///
/// A client never changes its configuration. Automatic capture of panics and failed tasks is
/// always off, so every reported event originates from an explicit send. Recording can be started
/// on a live client through its [`ReplayTrigger`], but only reconstruction stops it.
#[derive(Debug)]
pub struct MonitoringClient {
    options: ClientOptions,
    transport: Option<Arc<dyn Transport>>,
    recorder: Recorder,
}

impl MonitoringClient {
    /// Creates a client from its options and transport.
    ///
    /// The client stays disabled and drops every item when no transport is given.
    pub fn new(options: ClientOptions, transport: Option<Arc<dyn Transport>>) -> Self {
        let recorder = Recorder::new(options.replay);
        Self {
            options,
            transport,
            recorder,
        }
    }

    /// Returns the options the client was built with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns `true` if the client transmits items.
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Returns `true` if the client is currently recording the session.
    pub fn is_recording(&self) -> bool {
        self.recorder.active.load(Ordering::Relaxed)
    }

    /// Returns the direct recording trigger, if this client has one.
    ///
    /// Only enabled clients that were built with the recording capability expose a trigger.
    pub fn replay_trigger(&self) -> Option<ReplayTrigger<'_>> {
        (self.is_enabled() && self.recorder.options.enabled).then_some(ReplayTrigger {
            recorder: &self.recorder,
        })
    }

    /// Submits an event and normalizes the answer.
    ///
    /// Transport failures resolve into an outcome without a remote identifier. Only internal
    /// failures are returned as errors.
    pub async fn send(&self, kind: EventKind, payload: Payload) -> Result<SendOutcome, ClientError> {
        if payload.is_empty() {
            return Err(ClientError::EmptyPayload(kind));
        }

        let Some(transport) = &self.transport else {
            beacon_log::debug!(%kind, "client disabled, dropping item");
            return Ok(SendOutcome::from_response(&ItemResponse::default()));
        };

        let item = Item::new(
            kind,
            payload,
            &self.options.environment,
            &self.options.code_version,
        );
        let item_id = item.uuid();
        beacon_log::trace!(%kind, item = %item_id, "submitting item");

        let outcome = match transport.send(item).await {
            Ok(response) => {
                beacon_log::debug!(item = %item_id, ?response, "item submitted");
                SendOutcome::from_response(&response)
            }
            Err(error) => {
                beacon_log::warn!(
                    item = %item_id,
                    error = &error as &dyn Error,
                    "failed to submit item"
                );
                SendOutcome::from_failure(error.status())
            }
        };

        Ok(outcome)
    }
}

/// Result of changing the recording preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordingChange {
    /// The live client already reflects the new preference.
    Applied,
    /// The preference only takes effect once the client is reinitialized.
    ReinitRequired,
}

/// Holder of the single [`MonitoringClient`] of a session.
///
/// The client is constructed on first use from the resolved access token and the persisted
/// recording preference. Afterwards, the same client is returned even if the token or preference
/// change, until [`reinitialize`](Self::reinitialize) is called.
#[derive(Debug)]
pub struct ClientSlot {
    config: Arc<Config>,
    store: Arc<dyn LocalStore>,
    resolver: CredentialResolver,
    connector: Arc<dyn Connector>,
    current: Mutex<Option<Arc<MonitoringClient>>>,
    generation: AtomicU64,
}

impl ClientSlot {
    /// Creates an empty slot.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn LocalStore>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let resolver = CredentialResolver::new(
            store.clone(),
            config.fallback_token().map(str::to_owned),
        );

        Self {
            config,
            store,
            resolver,
            connector,
            current: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Returns the resolver used to find the access token.
    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    /// Returns the local storage.
    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    /// Returns `true` if a client has been constructed since the last reinitialization.
    pub fn is_initialized(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Returns how often the client has been reinitialized.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Returns the client, constructing it on first use.
    pub fn client(&self) -> Result<Arc<MonitoringClient>, ClientError> {
        let mut current = self.current.lock();
        if let Some(client) = current.as_ref() {
            return Ok(client.clone());
        }

        let options = self.options();
        beacon_log::info!(
            enabled = options.enabled(),
            recording = options.replay.auto_start,
            environment = %options.environment,
            "initializing monitoring client"
        );
        beacon_log::debug!(?options, "monitoring client options");

        let transport = match &options.access_token {
            Some(token) => Some(self.connector.connect(&options, token)?),
            None => None,
        };

        let client = Arc::new(MonitoringClient::new(options, transport));
        *current = Some(client.clone());
        Ok(client)
    }

    /// Drops the current client, so that the next call to [`client`](Self::client) constructs a
    /// new one from the current token and preference.
    pub fn reinitialize(&self) {
        let previous = self.current.lock().take();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        if previous.is_some() {
            beacon_log::info!(generation, "monitoring client reinitialized");
        }
    }

    /// Submits an event through the current client.
    pub async fn send(&self, kind: EventKind, payload: Payload) -> Result<SendOutcome, ClientError> {
        let client = self.client()?;
        client.send(kind, payload).await
    }

    /// Enables session recording.
    ///
    /// The preference is only persisted once a client is available, so a failed construction
    /// leaves it untouched. If the current client can start recording directly, it does so.
    /// Otherwise, the client was built without a usable recording capability and has to be
    /// reinitialized.
    pub fn start_recording(&self) -> Result<RecordingChange, ClientError> {
        let client = self.client()?;
        store::set_recording_enabled(self.store.as_ref(), true)?;

        match client.replay_trigger() {
            Some(trigger) => {
                trigger.trigger(&[MANUAL_START_TAG]);
                Ok(RecordingChange::Applied)
            }
            None => {
                beacon_log::warn!("direct recording trigger not available, reinitialization required");
                Ok(RecordingChange::ReinitRequired)
            }
        }
    }

    /// Disables session recording.
    ///
    /// The transport cannot stop a running recording, so this always requires reinitialization.
    /// The preference is persisted even if no client has been constructed yet.
    pub fn stop_recording(&self) -> Result<RecordingChange, ClientError> {
        store::set_recording_enabled(self.store.as_ref(), false)?;
        beacon_log::info!("session recording stops after reinitialization");
        Ok(RecordingChange::ReinitRequired)
    }

    fn options(&self) -> ClientOptions {
        ClientOptions {
            access_token: self.resolver.resolve(),
            environment: self.config.environment().to_owned(),
            endpoint: self.config.endpoint().clone(),
            code_version: self.config.code_version().to_owned(),
            timeout: self.config.request_timeout(),
            capture_uncaught: false,
            capture_unhandled_rejections: false,
            replay: ReplayOptions {
                enabled: true,
                auto_start: store::recording_enabled(self.store.as_ref()),
            },
        }
    }
}
