use http::Method;

const BASE_SEGMENT: &str = "chatconnector";

/// Protocol generation of the live-chat surface. V2 inserts a `v2` path
/// segment; a client only ever moves from V1 to V2, never back.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LiveChatVersion {
    #[default]
    V1,
    V2,
}

/// One operation on the connector's wire surface.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operation {
    WidgetConfig,
    ChatToken,
    SessionInit,
    SessionClose,
    Transcript,
    EmailTranscript,
    PostChatSubmission,
    SurveyInvite,
    Typing,
    SecondaryChannelEvent,
    DataMasking,
    AgentAvailability,
}

impl Operation {
    pub fn segment(&self) -> &'static str {
        match self {
            Operation::WidgetConfig => "config",
            Operation::ChatToken => "token",
            Operation::SessionInit => "session/init",
            Operation::SessionClose => "session/close",
            Operation::Transcript => "transcripts",
            Operation::EmailTranscript => "transcripts/email",
            Operation::PostChatSubmission => "postchat",
            Operation::SurveyInvite => "surveyinvite",
            Operation::Typing => "typing",
            Operation::SecondaryChannelEvent => "channelevents",
            Operation::DataMasking => "datamasking",
            Operation::AgentAvailability => "availability",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Operation::WidgetConfig
            | Operation::ChatToken
            | Operation::Transcript
            | Operation::DataMasking => Method::GET,
            _ => Method::POST,
        }
    }

    /// Label used in telemetry events and metric labels.
    pub fn as_label(&self) -> &'static str {
        match self {
            Operation::WidgetConfig => "widget.config",
            Operation::ChatToken => "token.fetch",
            Operation::SessionInit => "session.init",
            Operation::SessionClose => "session.close",
            Operation::Transcript => "transcript.fetch",
            Operation::EmailTranscript => "transcript.email",
            Operation::PostChatSubmission => "postchat.submit",
            Operation::SurveyInvite => "survey.invite",
            Operation::Typing => "typing.send",
            Operation::SecondaryChannelEvent => "channel.event",
            Operation::DataMasking => "datamasking.fetch",
            Operation::AgentAvailability => "availability.check",
        }
    }

    fn carries_correlation_id(&self) -> bool {
        !matches!(self, Operation::WidgetConfig | Operation::DataMasking)
    }

    // Config and data masking predate the v2 split and stay on the
    // original surface.
    fn versioned(&self) -> bool {
        !matches!(self, Operation::WidgetConfig | Operation::DataMasking)
    }
}

/// Everything resolution needs to know about one call.
#[derive(Clone, Copy, Debug)]
pub struct RouteInput<'a> {
    pub op: Operation,
    pub version: LiveChatVersion,
    pub authenticated: bool,
    pub org_id: &'a str,
    pub widget_id: &'a str,
    pub correlation_id: &'a str,
    pub reconnect_id: Option<&'a str>,
}

/// Resolved wire layout for one call. The path is relative to the org url;
/// the channel id query pair is appended when the full url is built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathSpec {
    pub method: Method,
    pub path: String,
    pub needs_auth_header: bool,
}

/// Pure resolution of version, auth mode and reconnect into a path. The
/// version segment always precedes the auth segment.
pub fn resolve(input: RouteInput<'_>) -> PathSpec {
    let mut segments: Vec<&str> = vec![BASE_SEGMENT];
    if input.version == LiveChatVersion::V2 && input.op.versioned() {
        segments.push("v2");
    }
    if input.authenticated {
        segments.push("auth");
    }
    segments.push(input.org_id);
    segments.push(input.widget_id);
    segments.push(input.op.segment());
    if input.op.carries_correlation_id() {
        segments.push(input.correlation_id);
    }
    if let Some(reconnect_id) = input.reconnect_id {
        segments.push(reconnect_id);
    }
    PathSpec {
        method: input.op.method(),
        path: segments.join("/"),
        needs_auth_header: input.authenticated,
    }
}
