use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde_json::Value;
use uuid::Uuid;

use crate::config::{RetryPolicy, ServiceIdentity};
use crate::context::{InitContext, NoEnvironment, RequestOptions, SharedProbe};
use crate::dispatch;
use crate::endpoints::{LiveChatVersion, Operation, RouteInput, resolve};
use crate::error::ClientError;
use crate::request::{self, CallSpec};
use crate::transport::{ApiError, ReqwestTransport, SharedTransport, WireRequest};
use crate::types::{
    AgentAvailability, ChatToken, DataMaskingRules, PostChatSubmission, RawAgentAvailability,
    RawChatToken, RawDataMasking, RawSurveyInvite, RawTranscript, RawWidgetConfig,
    SecondaryChannelEvent, SurveyInvite, TranscriptEntry, WidgetConfig,
};

const VERSION_V1: u8 = 1;
const VERSION_V2: u8 = 2;

/// Handle to the connector service for one widget. Cloning is cheap and
/// clones share the transport and the live-chat version flag; the flag
/// only ever moves from V1 to V2.
#[derive(Clone)]
pub struct ConnectorClient {
    identity: ServiceIdentity,
    policy: RetryPolicy,
    transport: SharedTransport,
    probe: SharedProbe,
    version: Arc<AtomicU8>,
}

impl ConnectorClient {
    pub fn new(identity: ServiceIdentity) -> Self {
        Self {
            identity,
            policy: RetryPolicy::default(),
            transport: Arc::new(ReqwestTransport::default()),
            probe: Arc::new(NoEnvironment),
            version: Arc::new(AtomicU8::new(VERSION_V1)),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_transport(mut self, transport: SharedTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.transport = Arc::new(ReqwestTransport::new(client));
        self
    }

    pub fn with_probe(mut self, probe: SharedProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn live_chat_version(&self) -> LiveChatVersion {
        if self.version.load(Ordering::Relaxed) >= VERSION_V2 {
            LiveChatVersion::V2
        } else {
            LiveChatVersion::V1
        }
    }

    /// Fetches the widget configuration. A version 2 declaration upgrades
    /// this client for every later call; there is no downgrade path.
    pub async fn widget_config(
        &self,
        options: RequestOptions,
    ) -> Result<WidgetConfig, ClientError> {
        let (correlation_id, request) = self.prepare(Operation::WidgetConfig, &options, None)?;
        let raw: RawWidgetConfig = dispatch::request_payload(
            self.transport.as_ref(),
            &self.policy,
            Operation::WidgetConfig,
            &correlation_id,
            request,
        )
        .await?;
        let config = raw.into_config();
        if config.live_chat_version >= VERSION_V2 {
            self.version.fetch_max(VERSION_V2, Ordering::Relaxed);
        }
        Ok(config)
    }

    /// Acquires credentials for a fresh live-chat session.
    pub async fn chat_token(&self, options: RequestOptions) -> Result<ChatToken, ClientError> {
        let (correlation_id, request) = self.prepare(Operation::ChatToken, &options, None)?;
        let raw: RawChatToken = dispatch::request_payload(
            self.transport.as_ref(),
            &self.policy,
            Operation::ChatToken,
            &correlation_id,
            request,
        )
        .await?;
        Ok(raw.into_token(correlation_id))
    }

    /// Tries to resume an earlier session. `Ok(None)` means the service
    /// had nothing left to resume; that is a final answer, not a failure,
    /// and it is never retried.
    pub async fn reconnect_chat_token(
        &self,
        reconnect_id: &str,
        options: RequestOptions,
    ) -> Result<Option<ChatToken>, ClientError> {
        let options = RequestOptions {
            reconnect_id: Some(reconnect_id.to_string()),
            ..options
        };
        let (correlation_id, request) = self.prepare(Operation::ChatToken, &options, None)?;
        let raw: Option<RawChatToken> = dispatch::request_optional(
            self.transport.as_ref(),
            &self.policy,
            Operation::ChatToken,
            &correlation_id,
            request,
        )
        .await?;
        Ok(raw.map(|raw| raw.into_token(correlation_id)))
    }

    /// Opens the session on the service side. The init context is
    /// validated (locale, environment availability) before any request
    /// goes out.
    pub async fn init_session(
        &self,
        init: InitContext,
        options: RequestOptions,
    ) -> Result<(), ClientError> {
        let options = RequestOptions {
            init: Some(init),
            ..options
        };
        let (correlation_id, request) = self.prepare(Operation::SessionInit, &options, None)?;
        dispatch::request_ack(
            self.transport.as_ref(),
            &self.policy,
            Operation::SessionInit,
            &correlation_id,
            request,
        )
        .await
    }

    pub async fn close_session(&self, options: RequestOptions) -> Result<(), ClientError> {
        let (correlation_id, request) = self.prepare(Operation::SessionClose, &options, None)?;
        dispatch::request_ack(
            self.transport.as_ref(),
            &self.policy,
            Operation::SessionClose,
            &correlation_id,
            request,
        )
        .await
    }

    pub async fn transcript(
        &self,
        options: RequestOptions,
    ) -> Result<Vec<TranscriptEntry>, ClientError> {
        let (correlation_id, request) = self.prepare(Operation::Transcript, &options, None)?;
        let raw: RawTranscript = dispatch::request_payload(
            self.transport.as_ref(),
            &self.policy,
            Operation::Transcript,
            &correlation_id,
            request,
        )
        .await?;
        Ok(raw.into_entries())
    }

    pub async fn email_transcript(
        &self,
        email: &str,
        options: RequestOptions,
    ) -> Result<(), ClientError> {
        let payload = serde_json::json!({ "email": email });
        let (correlation_id, request) =
            self.prepare(Operation::EmailTranscript, &options, Some(payload))?;
        dispatch::request_ack(
            self.transport.as_ref(),
            &self.policy,
            Operation::EmailTranscript,
            &correlation_id,
            request,
        )
        .await
    }

    /// Sends the visitor's post-chat survey answers. Ack-only; the
    /// service keeps whatever it accepted.
    pub async fn submit_post_chat(
        &self,
        submission: PostChatSubmission,
        options: RequestOptions,
    ) -> Result<(), ClientError> {
        let payload = serde_json::to_value(&submission)
            .map_err(|err| ClientError::Api(ApiError::Config(err.into())))?;
        let (correlation_id, request) =
            self.prepare(Operation::PostChatSubmission, &options, Some(payload))?;
        dispatch::request_ack(
            self.transport.as_ref(),
            &self.policy,
            Operation::PostChatSubmission,
            &correlation_id,
            request,
        )
        .await
    }

    pub async fn survey_invite(
        &self,
        options: RequestOptions,
    ) -> Result<SurveyInvite, ClientError> {
        let (correlation_id, request) = self.prepare(Operation::SurveyInvite, &options, None)?;
        let raw: RawSurveyInvite = dispatch::request_payload(
            self.transport.as_ref(),
            &self.policy,
            Operation::SurveyInvite,
            &correlation_id,
            request,
        )
        .await?;
        Ok(raw.into_invite())
    }

    pub async fn send_typing(&self, options: RequestOptions) -> Result<(), ClientError> {
        let (correlation_id, request) = self.prepare(Operation::Typing, &options, None)?;
        dispatch::request_ack(
            self.transport.as_ref(),
            &self.policy,
            Operation::Typing,
            &correlation_id,
            request,
        )
        .await
    }

    pub async fn notify_secondary_channel(
        &self,
        event: SecondaryChannelEvent,
        options: RequestOptions,
    ) -> Result<(), ClientError> {
        let payload = serde_json::to_value(&event)
            .map_err(|err| ClientError::Api(ApiError::Config(err.into())))?;
        let (correlation_id, request) =
            self.prepare(Operation::SecondaryChannelEvent, &options, Some(payload))?;
        dispatch::request_ack(
            self.transport.as_ref(),
            &self.policy,
            Operation::SecondaryChannelEvent,
            &correlation_id,
            request,
        )
        .await
    }

    pub async fn data_masking_rules(
        &self,
        options: RequestOptions,
    ) -> Result<DataMaskingRules, ClientError> {
        let (correlation_id, request) = self.prepare(Operation::DataMasking, &options, None)?;
        let raw: RawDataMasking = dispatch::request_payload(
            self.transport.as_ref(),
            &self.policy,
            Operation::DataMasking,
            &correlation_id,
            request,
        )
        .await?;
        Ok(raw.into_rules())
    }

    pub async fn agent_availability(
        &self,
        init: InitContext,
        options: RequestOptions,
    ) -> Result<AgentAvailability, ClientError> {
        let options = RequestOptions {
            init: Some(init),
            ..options
        };
        let (correlation_id, request) =
            self.prepare(Operation::AgentAvailability, &options, None)?;
        let raw: RawAgentAvailability = dispatch::request_payload(
            self.transport.as_ref(),
            &self.policy,
            Operation::AgentAvailability,
            &correlation_id,
            request,
        )
        .await?;
        Ok(raw.into_availability())
    }

    fn prepare(
        &self,
        op: Operation,
        options: &RequestOptions,
        payload: Option<Value>,
    ) -> Result<(String, WireRequest), ClientError> {
        let correlation_id = options
            .correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let version = if options.force_v2 {
            LiveChatVersion::V2
        } else {
            self.live_chat_version()
        };
        let resolved = resolve(RouteInput {
            op,
            version,
            authenticated: options.auth_token.is_some(),
            org_id: self.identity.org_id(),
            widget_id: self.identity.widget_id(),
            correlation_id: &correlation_id,
            reconnect_id: options.reconnect_id.as_deref(),
        });
        let request = request::build(
            &self.identity,
            &resolved,
            CallSpec {
                correlation_id: &correlation_id,
                options,
                probe: self.probe.as_ref(),
                payload,
                connect_retries: self.policy.max_transport_retries,
            },
        )?;
        Ok((correlation_id, request))
    }
}
