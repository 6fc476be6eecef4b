use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

pub const CLIENT_HEADER: &str = "x-ocs-client";
pub const CORRELATION_HEADER: &str = "x-correlation-id";
pub const AUTH_HEADER: &str = "x-authenticated-user-token";
pub const REGION_HEADER: &str = "x-region";
pub const TRANSACTION_HEADER: &str = "x-transaction-id";

const MAX_REMOTE_MESSAGE_BYTES: usize = 512;

/// One fully-built request, ready for the wire. `connect_retries` bounds
/// how many extra connect-level tries the transport may spend on it.
#[derive(Clone, Debug)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub connect_retries: u32,
}

/// What came back, with the headers the dispatch layer cares about lifted
/// out of the header map.
#[derive(Clone, Debug)]
pub struct WireResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub region: Option<String>,
    pub transaction_id: Option<String>,
    pub retry_after: Option<Duration>,
}

impl WireResponse {
    /// Canned JSON response, mostly for scripted transports.
    pub fn json(status: StatusCode, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
            region: None,
            transaction_id: None,
            retry_after: None,
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: Vec::new(),
            region: None,
            transaction_id: None,
            retry_after: None,
        }
    }

    pub fn is_empty_body(&self) -> bool {
        self.status == StatusCode::NO_CONTENT || self.body.iter().all(u8::is_ascii_whitespace)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("connector configuration error")]
    Config(anyhow::Error),
    #[error("connector transport error")]
    Transport(#[source] reqwest::Error),
    #[error("connector remote error (status {status}, retry_after = {retry_after:?})")]
    Remote {
        status: StatusCode,
        retry_after: Option<Duration>,
        message: String,
        transaction_id: Option<String>,
    },
    #[error("connector response decode error")]
    Decode(anyhow::Error),
}

impl ApiError {
    /// Wire error for a non-success status. The body is trimmed so a
    /// verbose remote cannot flood the error chain.
    pub fn remote_from(response: &WireResponse) -> Self {
        let trimmed = &response.body[..response.body.len().min(MAX_REMOTE_MESSAGE_BYTES)];
        ApiError::Remote {
            status: response.status,
            retry_after: response.retry_after,
            message: String::from_utf8_lossy(trimmed).into_owned(),
            transaction_id: response.transaction_id.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Config(_) => "config",
            ApiError::Transport(_) => "transport",
            ApiError::Remote { .. } => "remote",
            ApiError::Decode(_) => "decode",
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Boundary between the dispatch engine and the network. A transport only
/// fails for connectivity-level problems; any HTTP status comes back as a
/// response for the engine to classify.
#[async_trait]
pub trait ConnectorTransport: Send + Sync {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, ApiError>;
}

pub type SharedTransport = std::sync::Arc<dyn ConnectorTransport>;

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn send_once(&self, request: &WireRequest) -> Result<WireResponse, reqwest::Error> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let region = header_string(response.headers(), REGION_HEADER);
        let transaction_id = header_string(response.headers(), TRANSACTION_HEADER);
        let retry_after = retry_after(response.headers());
        let body = response.bytes().await?.to_vec();
        Ok(WireResponse {
            status,
            body,
            region,
            transaction_id,
            retry_after,
        })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl ConnectorTransport for ReqwestTransport {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, ApiError> {
        let mut tries: u32 = 0;
        loop {
            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(err) if is_connectivity(&err) && tries < request.connect_retries => {
                    tries += 1;
                    let pause = connect_backoff(tries, Uuid::new_v4().as_u128());
                    tokio::time::sleep(pause).await;
                }
                Err(err) => return Err(ApiError::Transport(err)),
            }
        }
    }
}

fn is_connectivity(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

const CONNECT_BACKOFF_BASE_MS: u64 = 250;
const CONNECT_BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Pacing between connect-level tries within one attempt. Doubles each
/// try, stretched by up to one extra interval of jitter, capped. The
/// dispatch engine's pacing between attempts is separate and uses the
/// policy's fixed interval.
fn connect_backoff(tries: u32, jitter_seed: u128) -> Duration {
    let interval = CONNECT_BACKOFF_BASE_MS << tries.min(10);
    let jitter = (jitter_seed % u128::from(interval)) as u64;
    Duration::from_millis(interval + jitter).min(CONNECT_BACKOFF_CAP)
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|header| header.to_str().ok())
        .map(str::to_string)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}
