use std::sync::Arc;

use http::StatusCode;
use ocs_client::{ApiError, RequestOptions, RetryPolicy, WireResponse};
use serde_json::json;

#[path = "support/mod.rs"]
mod support;

const LEAKED_TOKEN: &str = "SECRET_TOKEN_123";

#[tokio::test(start_paused = true)]
#[tracing_test::traced_test]
async fn failure_logs_never_carry_the_token_or_coordinates() {
    let transport = Arc::new(support_transport());
    // The remote echoes the request payload back in its error body; the
    // log line must keep the shape but not the secrets.
    transport
        .push(Ok(WireResponse::json(
            StatusCode::BAD_REQUEST,
            &json!({
                "authToken": LEAKED_TOKEN,
                "geolocation": { "latitude": 48.85, "longitude": 2.35 },
                "customContext": { "plan": "gold" },
                "reason": "expired",
            }),
        )))
        .await;
    let client = support::client_with(Arc::clone(&transport), RetryPolicy::default());

    client
        .chat_token(RequestOptions::default().with_correlation_id("corr-redact"))
        .await
        .expect("second attempt succeeds");

    logs_assert(|lines: &[&str]| {
        let failed = lines.iter().any(|line| line.contains("attempt failed"));
        if !failed {
            return Err(format!("expected a failure log, lines: {lines:?}"));
        }
        if lines.iter().any(|line| line.contains(LEAKED_TOKEN)) {
            return Err("auth token leaked into the logs".to_string());
        }
        if lines.iter().any(|line| line.contains("48.85")) {
            return Err("geolocation leaked into the logs".to_string());
        }
        if lines.iter().any(|line| line.contains("gold")) {
            return Err("custom context value leaked into the logs".to_string());
        }
        let shape_kept = lines
            .iter()
            .any(|line| line.contains("reason") && line.contains("expired"));
        if !shape_kept {
            return Err(format!(
                "non-sensitive fields should stay visible, lines: {lines:?}"
            ));
        }
        Ok(())
    });
}

#[tokio::test(start_paused = true)]
#[tracing_test::traced_test]
async fn success_logs_carry_region_and_transaction_id() {
    let transport = Arc::new(support_transport());
    transport
        .push(Ok(WireResponse {
            region: Some("eu-west".to_string()),
            transaction_id: Some("tx-42".to_string()),
            ..WireResponse::json(StatusCode::OK, &support::token_body("chat-1"))
        }))
        .await;
    let client = support::client_with(Arc::clone(&transport), RetryPolicy::default());

    client
        .chat_token(RequestOptions::default().with_correlation_id("corr-ok"))
        .await
        .expect("token");

    logs_assert(|lines: &[&str]| {
        let succeeded = lines.iter().any(|line| {
            line.contains("attempt succeeded")
                && line.contains("eu-west")
                && line.contains("tx-42")
                && line.contains("corr-ok")
        });
        if succeeded {
            Ok(())
        } else {
            Err(format!("expected a success log, lines: {lines:?}"))
        }
    });
}

#[tokio::test(start_paused = true)]
#[tracing_test::traced_test]
async fn transport_errors_are_logged_by_kind_only() {
    let transport = Arc::new(support_transport());
    transport
        .push(Err(ApiError::Decode(anyhow::anyhow!(
            "expected value at line 1"
        ))))
        .await;
    let client = support::client_with(Arc::clone(&transport), RetryPolicy::default());

    client
        .chat_token(RequestOptions::default())
        .await
        .expect("second attempt succeeds");

    logs_assert(|lines: &[&str]| {
        let kinded = lines
            .iter()
            .any(|line| line.contains("attempt failed") && line.contains("decode"));
        if kinded {
            Ok(())
        } else {
            Err(format!("expected a decode failure log, lines: {lines:?}"))
        }
    });
}

fn support_transport() -> ocs_client::testkit::MockTransport {
    ocs_client::testkit::MockTransport::new(WireResponse::json(
        StatusCode::OK,
        &support::token_body("chat-1"),
    ))
}
