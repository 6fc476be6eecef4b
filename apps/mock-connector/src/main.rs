//! Fake Omnichat connector for demos and manual client testing.
//!
//! Serves the v1, v2 and authenticated token families with canned JSON.
//! `?fail=N` on the token route arms a counter that serves N 500s before
//! answering normally again, which is enough to watch the client's retry
//! loop from the outside. Reconnect requests always answer 204, so the
//! "nothing to resume" path is easy to exercise with curl.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Default)]
struct MockState {
    failures_remaining: AtomicUsize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/chatconnector/{org}/{widget}/config", get(widget_config))
        .route(
            "/chatconnector/{org}/{widget}/token/{correlation}",
            get(chat_token),
        )
        .route(
            "/chatconnector/{org}/{widget}/token/{correlation}/{reconnect}",
            get(reconnect_token),
        )
        .route(
            "/chatconnector/v2/{org}/{widget}/token/{correlation}",
            get(chat_token),
        )
        .route(
            "/chatconnector/auth/{org}/{widget}/token/{correlation}",
            get(auth_token),
        )
        .route(
            "/chatconnector/v2/auth/{org}/{widget}/token/{correlation}",
            get(auth_token),
        )
        .route(
            "/chatconnector/{org}/{widget}/session/init/{correlation}",
            post(ack),
        )
        .route(
            "/chatconnector/{org}/{widget}/session/close/{correlation}",
            post(ack),
        )
        .route(
            "/chatconnector/{org}/{widget}/typing/{correlation}",
            post(ack),
        )
        .route(
            "/chatconnector/{org}/{widget}/postchat/{correlation}",
            post(ack),
        )
        .route("/chatconnector/{org}/{widget}/datamasking", get(data_masking))
        .with_state(state);

    let listener = TcpListener::bind("0.0.0.0:9090").await?;
    tracing::info!("mock-connector listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn widget_config(
    Path((org, widget)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    tracing::info!(%org, %widget, channel = params.get("channelId").map(String::as_str), "config");
    Json(json!({
        "liveChatVersion": 2,
        "defaultLocale": "en-us",
        "widgetState": "active",
    }))
}

async fn chat_token(
    State(state): State<Arc<MockState>>,
    Path((org, widget, correlation)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if let Some(n) = params.get("fail").and_then(|raw| raw.parse::<usize>().ok()) {
        state.failures_remaining.fetch_max(n, Ordering::SeqCst);
        tracing::info!(n, "armed failure injection");
    }
    let remaining = state.failures_remaining.load(Ordering::SeqCst);
    if remaining > 0 {
        state
            .failures_remaining
            .store(remaining - 1, Ordering::SeqCst);
        tracing::warn!(%org, %widget, %correlation, remaining, "injected failure");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "injected failure"})),
        );
    }
    tracing::info!(%org, %widget, %correlation, "token issued");
    (
        StatusCode::OK,
        Json(json!({
            "chatId": Uuid::new_v4().to_string(),
            "token": "mock-token",
            "region": "local",
            "expiresIn": 1800,
        })),
    )
}

async fn auth_token(
    Path((org, widget, correlation)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !headers.contains_key("x-authenticated-user-token") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "missing user token"})),
        );
    }
    tracing::info!(%org, %widget, %correlation, "authenticated token issued");
    (
        StatusCode::OK,
        Json(json!({
            "chatId": Uuid::new_v4().to_string(),
            "token": "mock-auth-token",
            "region": "local",
            "expiresIn": 1800,
        })),
    )
}

async fn reconnect_token(
    Path((org, widget, correlation, reconnect)): Path<(String, String, String, String)>,
) -> StatusCode {
    tracing::info!(%org, %widget, %correlation, %reconnect, "nothing to resume");
    StatusCode::NO_CONTENT
}

async fn ack(payload: Option<Json<Value>>) -> Json<Value> {
    match payload {
        Some(Json(body)) => tracing::info!("ACK: {body}"),
        None => tracing::info!("ACK (no body)"),
    }
    Json(json!({}))
}

async fn data_masking() -> Json<Value> {
    Json(json!({
        "rules": { "creditCard": "\\d{13,16}" },
    }))
}
