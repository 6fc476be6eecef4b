#![allow(dead_code)]

use std::sync::Arc;

use ocs_client::testkit::MockTransport;
use ocs_client::{ChannelId, ConnectorClient, RetryPolicy, ServiceIdentity, SharedTransport};
use serde_json::{Value, json};

pub fn identity() -> ServiceIdentity {
    ServiceIdentity::new(
        "https://acme.example.com/chat",
        "org-42",
        "widget-7",
        ChannelId::LiveChat,
    )
    .expect("test identity")
}

pub fn token_body(chat_id: &str) -> Value {
    json!({
        "chatId": chat_id,
        "token": "SECRET_TOKEN_123",
        "region": "eu-west",
        "expiresIn": 1800,
    })
}

pub fn client_with(transport: Arc<MockTransport>, policy: RetryPolicy) -> ConnectorClient {
    ConnectorClient::new(identity())
        .with_policy(policy)
        .with_transport(transport as SharedTransport)
}
