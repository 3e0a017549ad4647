use async_trait::async_trait;

use crate::document::Document;
use crate::error::StoreError;

use super::{Response, Transport};

/// Reqwest-backed [`Transport`].
///
/// Relative URLs are joined onto `base_url`; absolute URLs pass through
/// untouched. Empty 2xx bodies (e.g. `204 No Content` from a delete) map to
/// an empty [`Document`].
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Use a preconfigured client (custom headers, timeouts, ...).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        HttpTransport {
            client,
            base_url: base_url.into(),
        }
    }

    fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if url.starts_with('/') {
            format!("{}{}", base, url)
        } else {
            format!("{}/{}", base, url)
        }
    }

    async fn read(
        &self,
        sent: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<Response, StoreError> {
        let response = sent.map_err(request_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(request_error)?;

        if !(200..300).contains(&status) {
            return Err(StoreError::Transport {
                status: Some(status),
                detail: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let document = if body.is_empty() {
            Document::default()
        } else {
            serde_json::from_slice(&body).map_err(|err| StoreError::Transport {
                status: Some(status),
                detail: format!("invalid response body: {}", err),
            })?
        };

        Ok(Response { status, document })
    }
}

fn request_error(err: reqwest::Error) -> StoreError {
    StoreError::Transport {
        status: err.status().map(|status| status.as_u16()),
        detail: err.to_string(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<Response, StoreError> {
        let request = self.client.get(self.absolute(url)).query(params);
        self.read(request.send().await).await
    }

    async fn patch(&self, url: &str, document: &Document) -> Result<Response, StoreError> {
        let request = self.client.patch(self.absolute(url)).json(document);
        self.read(request.send().await).await
    }

    async fn post(&self, url: &str, document: &Document) -> Result<Response, StoreError> {
        let request = self.client.post(self.absolute(url)).json(document);
        self.read(request.send().await).await
    }

    async fn delete(&self, url: &str) -> Result<Response, StoreError> {
        let request = self.client.delete(self.absolute(url));
        self.read(request.send().await).await
    }
}
