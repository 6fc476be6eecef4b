use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use url::Url;

use crate::cache_key;
use crate::config::ServiceIdentity;
use crate::context::{EnvironmentProbe, InitContext, RequestOptions};
use crate::endpoints::PathSpec;
use crate::error::{ClientError, ValidationError};
use crate::transport::{ApiError, AUTH_HEADER, CLIENT_HEADER, CORRELATION_HEADER, WireRequest};

const CLIENT_VALUE: &str = concat!("ocs-client/", env!("CARGO_PKG_VERSION"));

/// Inputs for building one wire request.
pub(crate) struct CallSpec<'a> {
    pub correlation_id: &'a str,
    pub options: &'a RequestOptions,
    pub probe: &'a dyn EnvironmentProbe,
    /// Operation-specific payload; mutually exclusive with an init body.
    pub payload: Option<Value>,
    pub connect_retries: u32,
}

/// Builds the wire request for one resolved operation. Validation happens
/// here, before anything touches the network.
pub(crate) fn build(
    identity: &ServiceIdentity,
    resolved: &PathSpec,
    call: CallSpec<'_>,
) -> Result<WireRequest, ClientError> {
    let body = match (call.payload, &call.options.init) {
        (Some(payload), _) => Some(payload),
        (None, Some(init)) => Some(init_body(identity, init, call.probe)?),
        (None, None) => None,
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(CLIENT_HEADER),
        HeaderValue::from_static(CLIENT_VALUE),
    );
    headers.insert(
        HeaderName::from_static(CORRELATION_HEADER),
        header_value(call.correlation_id, CORRELATION_HEADER)?,
    );
    if resolved.needs_auth_header {
        let token = call
            .options
            .auth_token
            .as_deref()
            .ok_or(ValidationError::MissingAuthToken)?;
        headers.insert(HeaderName::from_static(AUTH_HEADER), header_value(token, AUTH_HEADER)?);
    }

    let url = join_url(identity, &resolved.path).map_err(ClientError::Api)?;

    Ok(WireRequest {
        method: resolved.method.clone(),
        url,
        headers,
        body,
        connect_retries: call.connect_retries,
    })
}

fn init_body(
    identity: &ServiceIdentity,
    init: &InitContext,
    probe: &dyn EnvironmentProbe,
) -> Result<Value, ValidationError> {
    let locale = crate::locale::normalize(init.locale.as_deref());
    if !crate::locale::is_supported(&locale) {
        return Err(ValidationError::UnsupportedLocale(locale));
    }

    let mut body = Map::new();
    body.insert("locale".to_string(), Value::String(locale));

    if !init.custom_context.is_empty() {
        body.insert(
            "customContext".to_string(),
            Value::Object(
                init.custom_context
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                    .collect(),
            ),
        );
    }
    if let Some(geo) = &init.geolocation {
        body.insert("geolocation".to_string(), geo.to_json());
    }
    if init.include_environment {
        let Some(snapshot) = probe.snapshot() else {
            return Err(ValidationError::EnvironmentUnavailable);
        };
        body.insert("environment".to_string(), snapshot.to_json());
    }
    if !init.custom_context.is_empty() || init.portal_contact_id.is_some() {
        body.insert(
            "cacheKey".to_string(),
            Value::String(cache_key::compute(
                identity.org_id(),
                identity.widget_id(),
                &init.custom_context,
                init.portal_contact_id.as_deref(),
            )),
        );
    }
    if let Some(contact) = &init.portal_contact_id {
        body.insert("portalContactId".to_string(), Value::String(contact.clone()));
    }

    Ok(Value::Object(body))
}

fn header_value(value: &str, name: &'static str) -> Result<HeaderValue, ValidationError> {
    HeaderValue::from_str(value).map_err(|_| ValidationError::InvalidHeaderValue(name))
}

// The channel id query pair rides on every request, whatever the
// operation.
fn join_url(identity: &ServiceIdentity, path: &str) -> Result<Url, ApiError> {
    let mut url = identity
        .org_url()
        .join(path)
        .map_err(|err| ApiError::Config(err.into()))?;
    url.query_pairs_mut()
        .append_pair("channelId", identity.channel().as_str());
    Ok(url)
}
