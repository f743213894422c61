use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors from the backing-store wire client.
///
/// `KeyDoesNotExist` is an expected outcome on the `TTL` lazy-create path,
/// not a failure — callers match on it explicitly rather than logging it
/// as an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("redis error: {0}")]
    Redis(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed store reply: {0}")]
    Protocol(String),

    #[error("key does not exist")]
    KeyDoesNotExist,
}

/// Errors raised while validating a configured `IdentifierRule` / `RuleSet`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rule {index}: field_name must be non-empty for {kind} rules")]
    EmptyFieldName { index: usize, kind: &'static str },

    #[error("rule {index}: at least one of rate_limit.enabled or quota.enabled must be true")]
    NoLimitEnabled { index: usize },

    #[error("invalid duration literal: {0}")]
    InvalidDuration(String),

    #[error("missing required setting: {0}")]
    Missing(String),

    #[error("invalid setting {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Raised by the identifier resolver when no configured rule matches.
#[derive(Debug, Error)]
#[error("no valid identifier found in request")]
pub struct ResolverError;

/// Top-level error type spanning construction-time failures and the
/// request-time decision outcomes that the middleware boundary converts
/// into HTTP responses.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration invalid: {0}")]
    ConfigInvalid(#[from] ConfigError),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error(transparent)]
    NoIdentifier(#[from] ResolverError),

    #[error("rate limit exceeded")]
    RateLimitExceeded {
        status: StatusCode,
        body: String,
        content_type: &'static str,
    },

    #[error("quota exceeded")]
    QuotaExceeded {
        status: StatusCode,
        body: String,
        content_type: &'static str,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        match self {
            CoreError::ConfigInvalid(e) => {
                tracing::error!("config invalid: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "config_invalid".to_string(),
                        message: "middleware misconfigured".to_string(),
                    }),
                )
                    .into_response()
            }
            CoreError::StoreUnavailable(e) => {
                tracing::error!("store unavailable: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "store_unavailable".to_string(),
                        message: "backing store unavailable".to_string(),
                    }),
                )
                    .into_response()
            }
            CoreError::NoIdentifier(_) => (
                StatusCode::FORBIDDEN,
                Json(ErrorBody {
                    error: "Access denied".to_string(),
                    message: "No valid identifier found in request".to_string(),
                }),
            )
                .into_response(),
            CoreError::RateLimitExceeded {
                status,
                body,
                content_type,
            }
            | CoreError::QuotaExceeded {
                status,
                body,
                content_type,
            } => (status, [("content-type", content_type)], body).into_response(),
        }
    }
}
