//! HTTP delivery to the peer system.

use std::future::Future;
use std::pin::Pin;

use super::PeerError;
use crate::config::PeerConfig;
use crate::model::Ship;

/// Delivers departing ships to the peer system.
///
/// Dyn-compatible so workers can hold an `Arc<dyn PeerClient>` and tests can
/// swap in a scripted client.
pub trait PeerClient: Send + Sync + 'static {
    /// Hands the ship to the peer. `Ok` only for a 2xx response.
    fn deliver<'a>(
        &'a self,
        ship: &'a Ship,
    ) -> Pin<Box<dyn Future<Output = Result<(), PeerError>> + Send + 'a>>;
}

/// Peer client posting ships as JSON with reqwest.
pub struct ReqwestPeerClient {
    client: reqwest::Client,
    url: String,
}

impl ReqwestPeerClient {
    /// Creates a client posting to `<base_url>/ships` with the configured
    /// connect and request timeout.
    pub fn new(config: &PeerConfig) -> Result<Self, PeerError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PeerError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.ships_url(),
        })
    }

    /// The delivery URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PeerClient for ReqwestPeerClient {
    fn deliver<'a>(
        &'a self,
        ship: &'a Ship,
    ) -> Pin<Box<dyn Future<Output = Result<(), PeerError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .json(ship)
                .send()
                .await
                .map_err(|e| PeerError::Request(format!("POST {} failed: {}", self.url, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(PeerError::Status(status.as_u16()));
            }
            Ok(())
        })
    }
}
