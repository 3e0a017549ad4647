//! HTTP transport seam.
//!
//! Records and record sets talk to the backend exclusively through the
//! [`Transport`] trait, so the HTTP stack is swappable (tests inject a mock).
//! A reqwest-backed implementation is available behind the `http` feature.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpTransport;

use async_trait::async_trait;

use crate::document::Document;
use crate::error::StoreError;

/// A successful (2xx) backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub document: Document,
}

impl Response {
    pub fn new(status: u16, document: Document) -> Self {
        Response { status, document }
    }
}

/// The four operations this layer needs from an HTTP client.
///
/// Implementations resolve with a [`Response`] on 2xx and reject with
/// [`StoreError::Transport`] on network failure or any other status. No
/// retry of any kind; retry policy belongs to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, params: &[(String, String)])
        -> Result<Response, StoreError>;

    async fn patch(&self, url: &str, document: &Document) -> Result<Response, StoreError>;

    async fn post(&self, url: &str, document: &Document) -> Result<Response, StoreError>;

    async fn delete(&self, url: &str) -> Result<Response, StoreError>;
}
