//! Transport boundary to the mock server's management API.
//!
//! The harness never talks to the network directly; everything goes through
//! the [`Transport`] trait. [`HttpTransport`] is the real Mountebank client,
//! [`InMemoryTransport`] a socket-free stand-in for dry runs and tests.

pub mod http;
pub mod memory;

pub use http::HttpTransport;
pub use memory::InMemoryTransport;

use crate::imposter::Imposter;
use async_trait::async_trait;
use std::path::Path;

/// Errors from the transport layer. No retry policy lives here; failures
/// propagate to the harness, which attributes them to an alias and phase.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to mock server failed")]
    Http(#[from] reqwest::Error),
    #[error("mock server returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("no imposter on port {0}")]
    NotFound(u16),
    #[error("no ports available in the dynamic range")]
    PortsExhausted,
    #[error("malformed contract document")]
    InvalidContract(#[from] serde_json::Error),
    #[error("contract file I/O failed")]
    Io(#[from] std::io::Error),
}

/// Operations the lifecycle manager needs from a mock server.
///
/// `delete_if_exists` is the one idempotent operation by contract: deleting a
/// port nothing listens on is success, not an error. Everything else fails
/// loudly.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Remove every imposter on the server.
    async fn wipe_all(&self) -> Result<(), TransportError>;

    /// Create an imposter from a contract document on disk; returns the
    /// port the server assigned.
    async fn create_from_file(&self, contract: &Path) -> Result<u16, TransportError>;

    /// Delete the imposter on `port`, treating "already absent" as success.
    async fn delete_if_exists(&self, port: u16) -> Result<(), TransportError>;

    /// Fetch the descriptor on `port`, including its recorded requests.
    async fn fetch(&self, port: u16) -> Result<Imposter, TransportError>;

    /// Submit `imposter` in place of whatever occupies its port; returns the
    /// port the replacement landed on.
    async fn replace(&self, imposter: &Imposter) -> Result<u16, TransportError>;

    /// Fetch the replayable configuration on `port` and write it to
    /// `destination`.
    async fn save_to_path(&self, port: u16, destination: &Path) -> Result<(), TransportError>;
}
