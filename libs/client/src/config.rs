use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 1_000;
pub const DEFAULT_MAX_TRANSPORT_RETRIES: u32 = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unsupported channel id: {0}")]
    UnsupportedChannel(String),
    #[error("org url is not a valid absolute url")]
    InvalidOrgUrl(#[source] url::ParseError),
    #[error("retry policy requires at least one attempt")]
    InvalidRetryPolicy,
}

/// Delivery channels the connector exposes. The wire value rides in the
/// `channelId` query parameter on every request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelId {
    LiveChat,
    Voice,
    Sms,
    Whatsapp,
}

impl ChannelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelId::LiveChat => "livechat",
            ChannelId::Voice => "voice",
            ChannelId::Sms => "sms",
            ChannelId::Whatsapp => "whatsapp",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "livechat" => Ok(ChannelId::LiveChat),
            "voice" => Ok(ChannelId::Voice),
            "sms" => Ok(ChannelId::Sms),
            "whatsapp" => Ok(ChannelId::Whatsapp),
            other => Err(ConfigError::UnsupportedChannel(other.to_string())),
        }
    }
}

/// Coordinates of one widget inside one org. Validated here once; every
/// later layer assumes the fields are well formed.
#[derive(Clone, Debug)]
pub struct ServiceIdentity {
    org_url: Url,
    org_id: String,
    widget_id: String,
    channel: ChannelId,
}

impl ServiceIdentity {
    pub fn new(
        org_url: &str,
        org_id: impl Into<String>,
        widget_id: impl Into<String>,
        channel: ChannelId,
    ) -> Result<Self, ConfigError> {
        let org_id = org_id.into();
        let widget_id = widget_id.into();
        if org_url.trim().is_empty() {
            return Err(ConfigError::MissingField("org_url"));
        }
        if org_id.trim().is_empty() {
            return Err(ConfigError::MissingField("org_id"));
        }
        if widget_id.trim().is_empty() {
            return Err(ConfigError::MissingField("widget_id"));
        }
        let mut org_url = Url::parse(org_url).map_err(ConfigError::InvalidOrgUrl)?;
        if !org_url.path().ends_with('/') {
            let path = format!("{}/", org_url.path());
            org_url.set_path(&path);
        }
        Ok(Self {
            org_url,
            org_id,
            widget_id,
            channel,
        })
    }

    pub fn org_url(&self) -> &Url {
        &self.org_url
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }
}

/// How the dispatch engine paces one logical call. `max_attempts` bounds
/// the engine's own loop; `max_transport_retries` bounds the extra
/// connect-level tries inside a single attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub retry_on_rate_limit: bool,
    pub max_transport_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            retry_on_rate_limit: false,
            max_transport_retries: DEFAULT_MAX_TRANSPORT_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Applies a partial override on top of the defaults, field by field.
    pub fn from_overrides(overrides: RetryOverrides) -> Result<Self, ConfigError> {
        let mut policy = Self::default();
        if let Some(max_attempts) = overrides.max_attempts {
            policy.max_attempts = max_attempts;
        }
        if let Some(backoff_ms) = overrides.backoff_ms {
            policy.backoff = Duration::from_millis(backoff_ms);
        }
        if let Some(retry_on_rate_limit) = overrides.retry_on_rate_limit {
            policy.retry_on_rate_limit = retry_on_rate_limit;
        }
        if let Some(max_transport_retries) = overrides.max_transport_retries {
            policy.max_transport_retries = max_transport_retries;
        }
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryPolicy);
        }
        Ok(())
    }
}

/// Partial retry settings as embedders hand them over. Every field is
/// optional; a missing field keeps its default.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryOverrides {
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<u64>,
    pub retry_on_rate_limit: Option<bool>,
    pub max_transport_retries: Option<u32>,
}

impl RetryOverrides {
    /// Lenient extraction from an untyped config blob. Fields with the
    /// wrong shape (negative, non-numeric) count as absent.
    pub fn from_value(value: &Value) -> Self {
        Self {
            max_attempts: value
                .get("maxAttempts")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok()),
            backoff_ms: value.get("backoffMs").and_then(Value::as_u64),
            retry_on_rate_limit: value.get("retryOnRateLimit").and_then(Value::as_bool),
            max_transport_retries: value
                .get("maxTransportRetries")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok()),
        }
    }
}
