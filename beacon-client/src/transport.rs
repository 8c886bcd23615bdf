use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::client::{ClientError, ClientOptions};
use crate::credentials::AccessToken;
use crate::protocol::{Item, ItemResponse};

/// Path of the item API relative to the configured endpoint.
const ITEM_PATH: &str = "api/1/item/";

/// Header carrying the access token.
const ACCESS_TOKEN_HEADER: &str = "X-Rollbar-Access-Token";

/// A failure reported while submitting an item.
///
/// Transport failures are expected outcomes of a send. The client normalizes them into a
/// [`SendOutcome`](crate::SendOutcome) instead of propagating them.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The service answered with a non-success status.
    #[error("item rejected with status {status}")]
    Rejected {
        /// The HTTP status of the answer.
        status: u16,
    },
    /// The item could not be delivered, for example because the network is down.
    #[error("could not deliver item")]
    Network(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl TransportError {
    /// Returns the status carried by this failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status } => Some(*status),
            Self::Network(_) => None,
        }
    }
}

/// Submits items to the monitoring service.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync {
    /// Submits a single item and returns the service's answer.
    async fn send(&self, item: Item) -> Result<ItemResponse, TransportError>;
}

/// Constructs the [`Transport`] of a freshly built client.
///
/// Connectors are only invoked for clients that have an access token.
pub trait Connector: fmt::Debug + Send + Sync {
    /// Creates a transport for the given client options and token.
    fn connect(
        &self,
        options: &ClientOptions,
        token: &AccessToken,
    ) -> Result<Arc<dyn Transport>, ClientError>;
}

/// A [`Transport`] submitting items to the item API over HTTP.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    token: AccessToken,
}

impl HttpTransport {
    /// Creates a transport for the item API below `endpoint`.
    pub fn new(endpoint: &Url, token: AccessToken, timeout: Duration) -> Result<Self, ClientError> {
        let url = endpoint.join(ITEM_PATH).map_err(ClientError::InvalidEndpoint)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("beacon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Connect(Box::new(e)))?;

        Ok(Self { client, url, token })
    }

    /// Returns the URL items are posted to.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, item: Item) -> Result<ItemResponse, TransportError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(ACCESS_TOKEN_HEADER, self.token.as_str())
            .json(&item)
            .send()
            .await
            .map_err(|e| TransportError::Network(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(Box::new(e)))?;

        Ok(serde_json::from_slice(&body).unwrap_or_else(|error| {
            beacon_log::debug!(
                item = %item.uuid(),
                "unreadable item response, treating as unconfirmed: {error}"
            );
            ItemResponse::default()
        }))
    }
}

/// The default [`Connector`], creating an [`HttpTransport`] per client.
#[derive(Debug, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(
        &self,
        options: &ClientOptions,
        token: &AccessToken,
    ) -> Result<Arc<dyn Transport>, ClientError> {
        let transport = HttpTransport::new(&options.endpoint, token.clone(), options.timeout)?;
        beacon_log::debug!("submitting items to {}", transport.url());
        Ok(Arc::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_url() {
        let endpoint = Url::parse("https://api.rollbar.com/").unwrap();
        let token = AccessToken::new("token").unwrap();
        let transport = HttpTransport::new(&endpoint, token, Duration::from_secs(1)).unwrap();
        assert_eq!(transport.url().as_str(), "https://api.rollbar.com/api/1/item/");
    }

    #[test]
    fn test_item_url_with_prefix() {
        let endpoint = Url::parse("http://localhost:8080/proxy/").unwrap();
        let token = AccessToken::new("token").unwrap();
        let transport = HttpTransport::new(&endpoint, token, Duration::from_secs(1)).unwrap();
        assert_eq!(
            transport.url().as_str(),
            "http://localhost:8080/proxy/api/1/item/"
        );
    }

    #[test]
    fn test_failure_status() {
        assert_eq!(TransportError::Rejected { status: 429 }.status(), Some(429));
        let network = TransportError::Network(Box::new(std::io::Error::other("offline")));
        assert_eq!(network.status(), None);
    }
}
