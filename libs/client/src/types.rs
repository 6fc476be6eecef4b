use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Credential bundle for one live-chat session. The correlation id is the
/// one the call was dispatched with, attached so callers can tie the
/// credentials back to their own records.
#[derive(Clone, Debug)]
pub struct ChatToken {
    pub chat_id: String,
    pub token: String,
    pub region: Option<String>,
    pub stream_endpoint: Option<String>,
    pub expires_in: Option<u64>,
    pub correlation_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawChatToken {
    chat_id: String,
    token: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    stream_endpoint: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl RawChatToken {
    pub(crate) fn into_token(self, correlation_id: String) -> ChatToken {
        ChatToken {
            chat_id: self.chat_id,
            token: self.token,
            region: self.region,
            stream_endpoint: self.stream_endpoint,
            expires_in: self.expires_in,
            correlation_id,
        }
    }
}

/// Widget configuration as the org published it.
#[derive(Clone, Debug)]
pub struct WidgetConfig {
    pub live_chat_version: u8,
    pub default_locale: Option<String>,
    pub data_masking: Option<DataMaskingRules>,
    pub widget_state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawWidgetConfig {
    #[serde(default = "default_live_chat_version")]
    live_chat_version: u8,
    #[serde(default)]
    default_locale: Option<String>,
    #[serde(default)]
    data_masking: Option<RawDataMasking>,
    #[serde(default)]
    widget_state: Option<String>,
}

fn default_live_chat_version() -> u8 {
    1
}

impl RawWidgetConfig {
    pub(crate) fn into_config(self) -> WidgetConfig {
        WidgetConfig {
            live_chat_version: self.live_chat_version,
            default_locale: self.default_locale,
            data_masking: self.data_masking.map(RawDataMasking::into_rules),
            widget_state: self.widget_state,
        }
    }
}

/// Field-masking rules (field name to pattern) the widget must apply
/// before echoing user input.
#[derive(Clone, Debug, Default)]
pub struct DataMaskingRules {
    pub rules: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDataMasking {
    #[serde(default)]
    rules: BTreeMap<String, String>,
}

impl RawDataMasking {
    pub(crate) fn into_rules(self) -> DataMaskingRules {
        DataMaskingRules { rules: self.rules }
    }
}

/// One line of a conversation transcript. Timestamps that do not parse as
/// RFC 3339 come back as `None` rather than failing the whole fetch.
#[derive(Clone, Debug)]
pub struct TranscriptEntry {
    pub id: String,
    pub created_at: Option<OffsetDateTime>,
    pub sender: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawTranscript {
    #[serde(default)]
    entries: Vec<RawTranscriptEntry>,
}

impl RawTranscript {
    pub(crate) fn into_entries(self) -> Vec<TranscriptEntry> {
        self.entries
            .into_iter()
            .map(RawTranscriptEntry::into_entry)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTranscriptEntry {
    id: String,
    #[serde(default)]
    created_at: Option<String>,
    sender: String,
    content: String,
}

impl RawTranscriptEntry {
    fn into_entry(self) -> TranscriptEntry {
        let created_at = self
            .created_at
            .as_deref()
            .and_then(|ts| OffsetDateTime::parse(ts, &Rfc3339).ok());
        TranscriptEntry {
            id: self.id,
            created_at,
            sender: self.sender,
            content: self.content,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SurveyInvite {
    pub invite_url: String,
    pub survey_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawSurveyInvite {
    invite_url: String,
    #[serde(default)]
    survey_id: Option<String>,
}

impl RawSurveyInvite {
    pub(crate) fn into_invite(self) -> SurveyInvite {
        SurveyInvite {
            invite_url: self.invite_url,
            survey_id: self.survey_id,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AgentAvailability {
    pub available: bool,
    pub queue_position: Option<u32>,
    pub average_wait_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawAgentAvailability {
    available: bool,
    #[serde(default)]
    queue_position: Option<u32>,
    #[serde(default)]
    average_wait_seconds: Option<u64>,
}

impl RawAgentAvailability {
    pub(crate) fn into_availability(self) -> AgentAvailability {
        AgentAvailability {
            available: self.available,
            queue_position: self.queue_position,
            average_wait_seconds: self.average_wait_seconds,
        }
    }
}

/// Answers a visitor gives to the post-chat survey, posted once the
/// session is over.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostChatSubmission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey_id: Option<String>,
    pub responses: Value,
}

/// Out-of-band event forwarded to a secondary delivery channel, for
/// example an sms nudge about an in-progress live chat.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryChannelEvent {
    pub event_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}
