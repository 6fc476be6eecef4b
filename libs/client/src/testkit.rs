//! Scripted transport for tests and local experiments.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::transport::{ApiError, ConnectorTransport, WireRequest, WireResponse};

/// Transport that answers from a prepared script. Every request is
/// recorded; responses come off the front of the script, falling back to
/// `fallback` once drained.
pub struct MockTransport {
    pub requests: Mutex<Vec<WireRequest>>,
    script: Mutex<VecDeque<Result<WireResponse, ApiError>>>,
    fallback: WireResponse,
}

impl MockTransport {
    pub fn new(fallback: WireResponse) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            fallback,
        }
    }

    pub async fn push(&self, result: Result<WireResponse, ApiError>) {
        self.script.lock().await.push_back(result);
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl ConnectorTransport for MockTransport {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, ApiError> {
        self.requests.lock().await.push(request);
        match self.script.lock().await.pop_front() {
            Some(result) => result,
            None => Ok(self.fallback.clone()),
        }
    }
}
