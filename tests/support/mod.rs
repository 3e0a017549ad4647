pub mod fixtures;

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use jsonapi_store::{Document, Response, StoreError, Transport};

/// One recorded request.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Document>,
}

type Probe = Box<dyn Fn(&Call) + Send + Sync>;

/// Scripted [`Transport`]: queued responses are popped in order, every
/// request is recorded, and an optional probe runs while each request is
/// in flight (to observe flags and optimistic state mid-request).
///
/// An empty queue answers `200` with an empty document.
pub struct MockTransport {
    queue: Mutex<VecDeque<Result<Response, StoreError>>>,
    calls: Mutex<Vec<Call>>,
    probe: Mutex<Option<Probe>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(MockTransport {
            queue: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            probe: Mutex::new(None),
        })
    }

    pub fn queue_ok(&self, status: u16, document: Document) {
        self.queue
            .lock()
            .push_back(Ok(Response::new(status, document)));
    }

    pub fn queue_err(&self, status: u16, detail: &str) {
        self.queue.lock().push_back(Err(StoreError::Transport {
            status: Some(status),
            detail: detail.to_string(),
        }));
    }

    pub fn set_probe<F>(&self, probe: F)
    where
        F: Fn(&Call) + Send + Sync + 'static,
    {
        *self.probe.lock() = Some(Box::new(probe));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn respond(&self, call: Call) -> Result<Response, StoreError> {
        if let Some(probe) = &*self.probe.lock() {
            probe(&call);
        }
        self.calls.lock().push(call);
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Response::new(200, Document::default())))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<Response, StoreError> {
        self.respond(Call {
            method: "GET",
            url: url.to_string(),
            params: params.to_vec(),
            body: None,
        })
    }

    async fn patch(&self, url: &str, document: &Document) -> Result<Response, StoreError> {
        self.respond(Call {
            method: "PATCH",
            url: url.to_string(),
            params: Vec::new(),
            body: Some(document.clone()),
        })
    }

    async fn post(&self, url: &str, document: &Document) -> Result<Response, StoreError> {
        self.respond(Call {
            method: "POST",
            url: url.to_string(),
            params: Vec::new(),
            body: Some(document.clone()),
        })
    }

    async fn delete(&self, url: &str) -> Result<Response, StoreError> {
        self.respond(Call {
            method: "DELETE",
            url: url.to_string(),
            params: Vec::new(),
            body: None,
        })
    }
}
