//! Handoff of departing ships to the peer system.
//!
//! A ship that survives its outbound leg is serialized and posted to the
//! peer system. Delivery is best effort: network failures and non-2xx
//! responses come back as [`PeerError`] values, the transit worker counts
//! them against its [`RetryPolicy`], and nothing here ever panics.

mod http;
mod policy;

pub use http::{PeerClient, ReqwestPeerClient};
pub use policy::RetryPolicy;

#[cfg(test)]
pub use http::tests::MockPeerClient;

use thiserror::Error;

/// Errors from a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    /// The request never produced a response (connect, timeout, TLS...).
    #[error("Request failed: {0}")]
    Request(String),

    /// The peer answered with a non-2xx status.
    #[error("Peer responded with HTTP {0}")]
    Status(u16),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}
