//! Client SDK for the Omnichat connector service.
//!
//! The crate resolves which wire version and auth mode apply to a call,
//! builds the request, and drives it through a bounded retry engine with
//! per-attempt telemetry. Sensitive fields are redacted before anything
//! reaches a log line.

#![forbid(unsafe_code)]

pub mod cache_key;
pub mod client;
pub mod config;
pub mod context;
mod dispatch;
pub mod endpoints;
pub mod error;
pub mod locale;
pub mod redact;
mod request;
pub mod telemetry;
pub mod testkit;
pub mod transport;
pub mod types;

pub use client::ConnectorClient;
pub use config::{ChannelId, ConfigError, RetryOverrides, RetryPolicy, ServiceIdentity};
pub use context::{
    EnvironmentInfo, EnvironmentProbe, Geolocation, InitContext, NoEnvironment, RequestOptions,
    SharedProbe, StaticEnvironment,
};
pub use endpoints::{LiveChatVersion, Operation, PathSpec, RouteInput, resolve};
pub use error::{ClientError, ValidationError};
pub use transport::{
    ApiError, ConnectorTransport, ReqwestTransport, SharedTransport, WireRequest, WireResponse,
};
pub use types::{
    AgentAvailability, ChatToken, DataMaskingRules, PostChatSubmission, SecondaryChannelEvent,
    SurveyInvite, TranscriptEntry, WidgetConfig,
};
