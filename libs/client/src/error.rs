use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use crate::transport::ApiError;

/// Failures caught before any attempt is made. These never consume retry
/// budget and never reach the transport.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("unsupported locale: {0}")]
    UnsupportedLocale(String),
    #[error("environment enrichment requested but no probe is available")]
    EnvironmentUnavailable,
    #[error("authenticated route requires a user token")]
    MissingAuthToken,
    #[error("value is not a valid header: {0}")]
    InvalidHeaderValue(&'static str),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("rate limited by connector (retry_after = {retry_after:?})")]
    RateLimited {
        retry_after: Option<Duration>,
        #[source]
        source: ApiError,
    },
    #[error("retry budget exhausted after {attempts} of {max_attempts} attempts")]
    RetryBudgetExceeded {
        attempts: u32,
        max_attempts: u32,
        #[source]
        source: ApiError,
    },
    #[error("connector call failed")]
    Api(#[source] ApiError),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::RateLimited { source, .. }
            | ClientError::RetryBudgetExceeded { source, .. }
            | ClientError::Api(source) => source.status(),
            ClientError::Validation(_) => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::RateLimited { retry_after, .. } => *retry_after,
            ClientError::RetryBudgetExceeded { source, .. } | ClientError::Api(source) => {
                match source {
                    ApiError::Remote { retry_after, .. } => *retry_after,
                    _ => None,
                }
            }
            ClientError::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_message_names_the_configured_max() {
        let err = ClientError::RetryBudgetExceeded {
            attempts: 4,
            max_attempts: 4,
            source: ApiError::Decode(anyhow::anyhow!("bad payload")),
        };
        let message = err.to_string();
        assert!(message.contains("4 of 4"), "message was: {message}");
    }

    #[test]
    fn retry_after_surfaces_from_remote_source() {
        let err = ClientError::RateLimited {
            retry_after: Some(Duration::from_secs(9)),
            source: ApiError::Remote {
                status: StatusCode::TOO_MANY_REQUESTS,
                retry_after: Some(Duration::from_secs(9)),
                message: String::new(),
                transaction_id: None,
            },
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(9)));
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
    }
}
