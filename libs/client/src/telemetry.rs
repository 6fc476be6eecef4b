use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{Span, debug, info, info_span, warn};

use crate::endpoints::Operation;
use crate::redact;
use crate::transport::{ApiError, WireResponse};

pub const REQUESTS_TOTAL: &str = "ocs_requests_total";
pub const ERRORS_TOTAL: &str = "ocs_errors_total";
pub const RETRIES_TOTAL: &str = "ocs_retries_total";
pub const ROUNDTRIP_SECONDS: &str = "ocs_roundtrip_seconds";

pub const DISPATCH_SPAN: &str = "ocs.dispatch";

pub fn dispatch_span(op: Operation, correlation_id: &str) -> Span {
    info_span!(DISPATCH_SPAN, operation = op.as_label(), %correlation_id)
}

pub fn attempt_started(op: Operation, correlation_id: &str, attempt: u32) {
    debug!(
        operation = op.as_label(),
        %correlation_id,
        attempt,
        "attempt started"
    );
    counter!(REQUESTS_TOTAL, "operation" => op.as_label()).increment(1);
}

pub fn attempt_succeeded(
    op: Operation,
    correlation_id: &str,
    attempt: u32,
    started: Instant,
    response: &WireResponse,
) {
    let elapsed = started.elapsed();
    let status_label = response.status.as_str().to_string();
    info!(
        operation = op.as_label(),
        %correlation_id,
        attempt,
        elapsed_ms = elapsed.as_millis() as u64,
        status = response.status.as_u16(),
        region = response.region.as_deref().unwrap_or("-"),
        transaction_id = response.transaction_id.as_deref().unwrap_or("-"),
        "attempt succeeded"
    );
    histogram!(
        ROUNDTRIP_SECONDS,
        "operation" => op.as_label(),
        "status" => status_label
    )
    .record(elapsed.as_secs_f64());
}

/// Every failure goes through redaction before it is logged, whether or
/// not a subscriber is installed.
pub fn attempt_failed(
    op: Operation,
    correlation_id: &str,
    attempt: u32,
    started: Instant,
    err: &ApiError,
    will_retry: bool,
) {
    let elapsed = started.elapsed();
    let fields = redact::error_fields(err);
    let status_label = err
        .status()
        .map(|status| status.as_str().to_string())
        .unwrap_or_else(|| err.kind().to_string());
    warn!(
        operation = op.as_label(),
        %correlation_id,
        attempt,
        elapsed_ms = elapsed.as_millis() as u64,
        will_retry,
        error = %fields,
        "attempt failed"
    );
    counter!(
        ERRORS_TOTAL,
        "operation" => op.as_label(),
        "kind" => err.kind()
    )
    .increment(1);
    if will_retry {
        counter!(RETRIES_TOTAL, "operation" => op.as_label()).increment(1);
    }
    histogram!(
        ROUNDTRIP_SECONDS,
        "operation" => op.as_label(),
        "status" => status_label
    )
    .record(elapsed.as_secs_f64());
}
