use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};
use ocs_client::testkit::MockTransport;
use ocs_client::{
    ClientError, LiveChatVersion, PostChatSubmission, RequestOptions, RetryPolicy, WireResponse,
};
use serde_json::json;

#[path = "support/mod.rs"]
mod support;

fn remote_error(status: u16) -> WireResponse {
    WireResponse::json(
        StatusCode::from_u16(status).expect("status"),
        &json!({"error": "boom"}),
    )
}

#[tokio::test(start_paused = true)]
async fn retries_until_success_and_reuses_correlation_id() {
    let transport = Arc::new(MockTransport::new(WireResponse::json(
        StatusCode::OK,
        &support::token_body("chat-1"),
    )));
    transport.push(Ok(remote_error(500))).await;
    transport.push(Ok(remote_error(503))).await;
    let client = support::client_with(
        Arc::clone(&transport),
        RetryPolicy {
            max_attempts: 5,
            ..RetryPolicy::default()
        },
    );

    let token = client
        .chat_token(RequestOptions::default().with_correlation_id("corr-1"))
        .await
        .expect("token after retries");

    assert_eq!(token.chat_id, "chat-1");
    assert_eq!(token.correlation_id, "corr-1");
    let requests = transport.requests.lock().await;
    assert_eq!(requests.len(), 3);
    for request in requests.iter() {
        assert!(request.url.path().ends_with("/token/corr-1"));
        assert_eq!(
            request
                .headers
                .get("x-correlation-id")
                .and_then(|value| value.to_str().ok()),
            Some("corr-1")
        );
    }
}

#[tokio::test(start_paused = true)]
async fn exhausts_budget_after_exactly_max_attempts() {
    let transport = Arc::new(MockTransport::new(remote_error(500)));
    let client = support::client_with(
        Arc::clone(&transport),
        RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        },
    );

    let err = client
        .chat_token(RequestOptions::default())
        .await
        .expect_err("budget must run out");
    let message = err.to_string();

    match err {
        ClientError::RetryBudgetExceeded {
            attempts,
            max_attempts,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(max_attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(message.contains("3 of 3"), "message was: {message}");
    assert_eq!(transport.request_count().await, 3);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_is_terminal_by_default() {
    let transport = Arc::new(MockTransport::new(WireResponse::json(
        StatusCode::OK,
        &support::token_body("chat-1"),
    )));
    transport
        .push(Ok(WireResponse {
            retry_after: Some(Duration::from_secs(7)),
            ..WireResponse::json(StatusCode::TOO_MANY_REQUESTS, &json!({"error": "slow down"}))
        }))
        .await;
    let client = support::client_with(Arc::clone(&transport), RetryPolicy::default());

    let err = client
        .chat_token(RequestOptions::default())
        .await
        .expect_err("rate limit is terminal");

    match err {
        ClientError::RateLimited { retry_after, .. } => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(transport.request_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_is_retried_when_policy_allows() {
    let transport = Arc::new(MockTransport::new(WireResponse::json(
        StatusCode::OK,
        &support::token_body("chat-1"),
    )));
    transport
        .push(Ok(WireResponse::json(
            StatusCode::TOO_MANY_REQUESTS,
            &json!({"error": "slow down"}),
        )))
        .await;
    let client = support::client_with(
        Arc::clone(&transport),
        RetryPolicy {
            retry_on_rate_limit: true,
            ..RetryPolicy::default()
        },
    );

    let token = client
        .chat_token(RequestOptions::default())
        .await
        .expect("retried past the rate limit");

    assert_eq!(token.chat_id, "chat-1");
    assert_eq!(transport.request_count().await, 2);
}

#[tokio::test(start_paused = true)]
async fn reconnect_no_content_resolves_none_without_retry() {
    let transport = Arc::new(MockTransport::new(WireResponse::empty(
        StatusCode::NO_CONTENT,
    )));
    let client = support::client_with(Arc::clone(&transport), RetryPolicy::default());

    let token = client
        .reconnect_chat_token("rc-9", RequestOptions::default())
        .await
        .expect("no content is a final answer");

    assert!(token.is_none());
    assert_eq!(transport.request_count().await, 1);
    let requests = transport.requests.lock().await;
    assert!(requests[0].url.path().ends_with("/rc-9"));
}

#[tokio::test(start_paused = true)]
async fn undecodable_success_body_is_retried() {
    let transport = Arc::new(MockTransport::new(WireResponse::json(
        StatusCode::OK,
        &support::token_body("chat-1"),
    )));
    let mut garbage = WireResponse::empty(StatusCode::OK);
    garbage.body = b"<html>gateway error</html>".to_vec();
    transport.push(Ok(garbage)).await;
    let client = support::client_with(Arc::clone(&transport), RetryPolicy::default());

    let token = client
        .chat_token(RequestOptions::default())
        .await
        .expect("second attempt decodes");

    assert_eq!(token.chat_id, "chat-1");
    assert_eq!(transport.request_count().await, 2);
}

#[tokio::test(start_paused = true)]
async fn waits_the_configured_backoff_between_attempts() {
    let transport = Arc::new(MockTransport::new(WireResponse::json(
        StatusCode::OK,
        &support::token_body("chat-1"),
    )));
    transport.push(Ok(remote_error(500))).await;
    transport.push(Ok(remote_error(502))).await;
    let client = support::client_with(
        Arc::clone(&transport),
        RetryPolicy {
            max_attempts: 5,
            backoff: Duration::from_millis(250),
            ..RetryPolicy::default()
        },
    );

    let started = tokio::time::Instant::now();
    client
        .chat_token(RequestOptions::default())
        .await
        .expect("token");

    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(transport.request_count().await, 3);
}

#[tokio::test(start_paused = true)]
async fn post_chat_submission_posts_the_answers() {
    let transport = Arc::new(MockTransport::new(WireResponse::empty(StatusCode::OK)));
    let client = support::client_with(Arc::clone(&transport), RetryPolicy::default());

    client
        .submit_post_chat(
            PostChatSubmission {
                survey_id: Some("sv-1".to_string()),
                responses: json!({ "rating": 5, "comment": "quick and helpful" }),
            },
            RequestOptions::default().with_correlation_id("corr-pc"),
        )
        .await
        .expect("submission acknowledged");

    let requests = transport.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::POST);
    assert!(requests[0].url.path().ends_with("/postchat/corr-pc"));
    let body = requests[0].body.as_ref().expect("body");
    assert_eq!(body["surveyId"], "sv-1");
    assert_eq!(body["responses"]["rating"], 5);
}

#[tokio::test(start_paused = true)]
async fn generates_a_correlation_id_when_none_is_given() {
    let transport = Arc::new(MockTransport::new(WireResponse::json(
        StatusCode::OK,
        &support::token_body("chat-1"),
    )));
    let client = support::client_with(Arc::clone(&transport), RetryPolicy::default());

    let token = client
        .chat_token(RequestOptions::default())
        .await
        .expect("token");

    assert!(!token.correlation_id.is_empty());
    let requests = transport.requests.lock().await;
    assert!(
        requests[0]
            .url
            .path()
            .ends_with(&format!("/token/{}", token.correlation_id))
    );
}

#[tokio::test(start_paused = true)]
async fn forcing_v2_does_not_move_the_version_flag() {
    let transport = Arc::new(MockTransport::new(WireResponse::json(
        StatusCode::OK,
        &support::token_body("chat-1"),
    )));
    let client = support::client_with(Arc::clone(&transport), RetryPolicy::default());

    client
        .chat_token(RequestOptions {
            force_v2: true,
            ..RequestOptions::default()
        })
        .await
        .expect("forced v2 token");
    client
        .chat_token(RequestOptions::default())
        .await
        .expect("plain token");

    assert_eq!(client.live_chat_version(), LiveChatVersion::V1);
    let requests = transport.requests.lock().await;
    assert!(requests[0].url.path().contains("/v2/"));
    assert!(!requests[1].url.path().contains("/v2/"));
}

#[tokio::test(start_paused = true)]
async fn widget_config_upgrade_sticks_for_later_calls() {
    let transport = Arc::new(MockTransport::new(WireResponse::json(
        StatusCode::OK,
        &support::token_body("chat-1"),
    )));
    transport
        .push(Ok(WireResponse::json(
            StatusCode::OK,
            &json!({"liveChatVersion": 2}),
        )))
        .await;
    let client = support::client_with(Arc::clone(&transport), RetryPolicy::default());

    let config = client
        .widget_config(RequestOptions::default())
        .await
        .expect("config");
    assert_eq!(config.live_chat_version, 2);
    assert_eq!(client.live_chat_version(), LiveChatVersion::V2);

    client
        .chat_token(RequestOptions::default())
        .await
        .expect("token");
    let requests = transport.requests.lock().await;
    assert!(!requests[0].url.path().contains("/v2/"));
    assert!(requests[1].url.path().contains("/v2/"));
}
