//! Scriptable transport for testing code built on top of [`ClientSlot`](crate::ClientSlot).

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::client::{ClientError, ClientOptions};
use crate::credentials::AccessToken;
use crate::protocol::{Item, ItemResponse};
use crate::transport::{Connector, Transport, TransportError};

/// A [`Transport`] that records items and answers with scripted responses.
///
/// Without a script, every item is confirmed with a fresh identifier.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<ItemResponse, TransportError>>>,
    items: Mutex<Vec<serde_json::Value>>,
    gate: Option<Arc<Notify>>,
}

impl MockTransport {
    /// Creates a transport confirming every item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that holds every send until the returned gate is notified.
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let transport = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (transport, gate)
    }

    /// Queues the answer for the next unanswered item.
    pub fn respond(&self, response: Result<ItemResponse, TransportError>) {
        self.responses.lock().push_back(response);
    }

    /// Returns the number of items received.
    pub fn calls(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns the JSON bodies of all received items.
    pub fn items(&self) -> Vec<serde_json::Value> {
        self.items.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, item: Item) -> Result<ItemResponse, TransportError> {
        let uuid = item.uuid();
        let body = serde_json::to_value(&item).unwrap_or_default();
        self.items.lock().push(body);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let scripted = self.responses.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(ItemResponse::confirmed(uuid.to_string())))
    }
}

/// A [`Connector`] handing out a shared [`MockTransport`].
#[derive(Debug)]
pub struct MockConnector {
    transport: Arc<MockTransport>,
    connects: AtomicUsize,
    fail: bool,
}

impl MockConnector {
    /// Creates a connector for the given transport.
    pub fn new(transport: Arc<MockTransport>) -> Self {
        Self {
            transport,
            connects: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// Creates a connector that fails to construct a transport.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Arc::new(MockTransport::new()))
        }
    }

    /// Returns the shared transport.
    pub fn transport(&self) -> &Arc<MockTransport> {
        &self.transport
    }

    /// Returns how many transports were constructed.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        _options: &ClientOptions,
        _token: &AccessToken,
    ) -> Result<Arc<dyn Transport>, ClientError> {
        if self.fail {
            return Err(ClientError::Connect("mock connector refused".into()));
        }

        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.transport.clone())
    }
}
