use std::time::Instant;

use http::StatusCode;
use serde::de::DeserializeOwned;
use tracing::Instrument;

use crate::config::RetryPolicy;
use crate::endpoints::Operation;
use crate::error::ClientError;
use crate::telemetry;
use crate::transport::{ApiError, ConnectorTransport, WireRequest, WireResponse};

/// What the engine should accept as a successful body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Expect {
    /// A 2xx must carry a decodable payload.
    Payload,
    /// No content on a 2xx is a final, legitimate answer.
    OptionalPayload,
    /// Any 2xx is enough; the body is ignored.
    Ack,
}

#[derive(Debug)]
enum Outcome<T> {
    Payload(T),
    Empty,
}

pub(crate) async fn request_payload<T>(
    transport: &dyn ConnectorTransport,
    policy: &RetryPolicy,
    op: Operation,
    correlation_id: &str,
    request: WireRequest,
) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    match run(transport, policy, op, correlation_id, request, Expect::Payload).await? {
        Outcome::Payload(value) => Ok(value),
        Outcome::Empty => Err(ClientError::Api(ApiError::Decode(anyhow::anyhow!(
            "connector returned no content"
        )))),
    }
}

pub(crate) async fn request_optional<T>(
    transport: &dyn ConnectorTransport,
    policy: &RetryPolicy,
    op: Operation,
    correlation_id: &str,
    request: WireRequest,
) -> Result<Option<T>, ClientError>
where
    T: DeserializeOwned,
{
    match run(
        transport,
        policy,
        op,
        correlation_id,
        request,
        Expect::OptionalPayload,
    )
    .await?
    {
        Outcome::Payload(value) => Ok(Some(value)),
        Outcome::Empty => Ok(None),
    }
}

pub(crate) async fn request_ack(
    transport: &dyn ConnectorTransport,
    policy: &RetryPolicy,
    op: Operation,
    correlation_id: &str,
    request: WireRequest,
) -> Result<(), ClientError> {
    run::<serde_json::Value>(transport, policy, op, correlation_id, request, Expect::Ack)
        .await
        .map(|_| ())
}

async fn run<T>(
    transport: &dyn ConnectorTransport,
    policy: &RetryPolicy,
    op: Operation,
    correlation_id: &str,
    request: WireRequest,
    expect: Expect,
) -> Result<Outcome<T>, ClientError>
where
    T: DeserializeOwned,
{
    let span = telemetry::dispatch_span(op, correlation_id);
    drive(transport, policy, op, correlation_id, request, expect)
        .instrument(span)
        .await
}

/// The retry loop. One logical call reuses its correlation id on every
/// attempt; only the attempt counter and the wire outcomes vary.
async fn drive<T>(
    transport: &dyn ConnectorTransport,
    policy: &RetryPolicy,
    op: Operation,
    correlation_id: &str,
    request: WireRequest,
    expect: Expect,
) -> Result<Outcome<T>, ClientError>
where
    T: DeserializeOwned,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;
    loop {
        let started = Instant::now();
        telemetry::attempt_started(op, correlation_id, attempt);

        let error = match transport.execute(request.clone()).await {
            Ok(response) => match classify(&response, expect) {
                Classified::Success => match settle::<T>(&response, expect) {
                    Ok(outcome) => {
                        telemetry::attempt_succeeded(op, correlation_id, attempt, started, &response);
                        return Ok(outcome);
                    }
                    Err(err) => err,
                },
                Classified::Empty => {
                    telemetry::attempt_succeeded(op, correlation_id, attempt, started, &response);
                    return Ok(Outcome::Empty);
                }
                Classified::RateLimited => {
                    let err = ApiError::remote_from(&response);
                    if policy.retry_on_rate_limit {
                        err
                    } else {
                        telemetry::attempt_failed(op, correlation_id, attempt, started, &err, false);
                        return Err(ClientError::RateLimited {
                            retry_after: response.retry_after,
                            source: err,
                        });
                    }
                }
                Classified::Failed => ApiError::remote_from(&response),
            },
            Err(err) => err,
        };

        let attempts_made = attempt + 1;
        if attempts_made < max_attempts {
            telemetry::attempt_failed(op, correlation_id, attempt, started, &error, true);
            tokio::time::sleep(policy.backoff).await;
            attempt = attempts_made;
            continue;
        }

        telemetry::attempt_failed(op, correlation_id, attempt, started, &error, false);
        return Err(ClientError::RetryBudgetExceeded {
            attempts: attempts_made,
            max_attempts,
            source: error,
        });
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Classified {
    Success,
    Empty,
    RateLimited,
    Failed,
}

// Rate limiting is checked first so a 429 never counts as an empty
// reconnect answer.
fn classify(response: &WireResponse, expect: Expect) -> Classified {
    if response.status == StatusCode::TOO_MANY_REQUESTS {
        return Classified::RateLimited;
    }
    if response.status.is_success() {
        if expect == Expect::OptionalPayload && response.is_empty_body() {
            return Classified::Empty;
        }
        return Classified::Success;
    }
    Classified::Failed
}

fn settle<T>(response: &WireResponse, expect: Expect) -> Result<Outcome<T>, ApiError>
where
    T: DeserializeOwned,
{
    if expect == Expect::Ack {
        return Ok(Outcome::Empty);
    }
    serde_json::from_slice(&response.body)
        .map(Outcome::Payload)
        .map_err(|err| ApiError::Decode(err.into()))
}
