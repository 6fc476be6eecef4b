use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Per-call knobs. One value per logical operation, dropped when the call
/// resolves.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Generated (uuid v4) when absent. Reused verbatim across every
    /// retry attempt of the call.
    pub correlation_id: Option<String>,
    pub auth_token: Option<String>,
    pub reconnect_id: Option<String>,
    /// Forces the v2 surface for this call only; the client-wide version
    /// flag is untouched.
    pub force_v2: bool,
    pub init: Option<InitContext>,
}

impl RequestOptions {
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_init(mut self, init: InitContext) -> Self {
        self.init = Some(init);
        self
    }
}

/// Caller-supplied bootstrap data for session-establishing operations.
#[derive(Clone, Debug, Default)]
pub struct InitContext {
    pub locale: Option<String>,
    pub custom_context: BTreeMap<String, String>,
    pub geolocation: Option<Geolocation>,
    pub portal_contact_id: Option<String>,
    /// When set, the request must carry an environment snapshot; building
    /// fails if no probe can supply one.
    pub include_environment: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl Geolocation {
    pub(crate) fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("latitude".to_string(), self.latitude.into());
        map.insert("longitude".to_string(), self.longitude.into());
        if let Some(city) = &self.city {
            map.insert("city".to_string(), city.clone().into());
        }
        if let Some(country) = &self.country {
            map.insert("country".to_string(), country.clone().into());
        }
        Value::Object(map)
    }
}

/// Host environment snapshot attached to bootstrap payloads.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentInfo {
    pub browser: String,
    pub device: String,
    pub os: String,
    pub page_url: Option<String>,
}

impl EnvironmentInfo {
    pub(crate) fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("browser".to_string(), self.browser.clone().into());
        map.insert("device".to_string(), self.device.clone().into());
        map.insert("os".to_string(), self.os.clone().into());
        if let Some(page_url) = &self.page_url {
            map.insert("pageUrl".to_string(), page_url.clone().into());
        }
        Value::Object(map)
    }
}

/// Where environment enrichment comes from. Embedders wire a real probe;
/// the default yields nothing, which turns enrichment requests into a
/// validation error instead of a silently thinner payload.
pub trait EnvironmentProbe: Send + Sync {
    fn snapshot(&self) -> Option<EnvironmentInfo>;
}

pub type SharedProbe = Arc<dyn EnvironmentProbe>;

#[derive(Clone, Copy, Debug, Default)]
pub struct NoEnvironment;

impl EnvironmentProbe for NoEnvironment {
    fn snapshot(&self) -> Option<EnvironmentInfo> {
        None
    }
}

/// Fixed snapshot, mostly for tests and non-browser embedders.
#[derive(Clone, Debug)]
pub struct StaticEnvironment(pub EnvironmentInfo);

impl EnvironmentProbe for StaticEnvironment {
    fn snapshot(&self) -> Option<EnvironmentInfo> {
        Some(self.0.clone())
    }
}
