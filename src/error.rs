//! Request-level errors. Every failure ends the request with an explicit
//! response; nothing is retried.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::handlers::oauth::handshake;
use crate::models::AppConfig;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Origin not authorized: {0}")]
    OriginRejected(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Malformed callback: {0}")]
    MalformedCallback(&'static str),

    #[error("State mismatch: {0}")]
    StateMismatch(&'static str),

    /// Failures talking to, or reported by, the identity provider.
    #[error("{source}")]
    Exchange {
        provider: String,
        allowed_origins: Vec<String>,
        #[source]
        source: ExchangeError,
    },
}

impl AppError {
    pub fn exchange(config: &AppConfig, source: ExchangeError) -> Self {
        AppError::Exchange {
            provider: config.provider.clone(),
            allowed_origins: config.allowed_origins.clone(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The provider redirected back with `error=...` instead of a code.
    #[error("Authorization denied by provider: {error}")]
    Denied {
        error: String,
        description: Option<String>,
    },

    /// The token endpoint answered with an OAuth error payload.
    #[error("Provider rejected the authorization code: {error}")]
    Rejected {
        error: String,
        description: Option<String>,
    },

    #[error("Timed out waiting for the provider token endpoint")]
    Timeout,

    #[error("Could not reach the provider token endpoint: {0}")]
    Unreachable(String),

    #[error("Unexpected response from the provider token endpoint (HTTP {status})")]
    InvalidResponse { status: u16 },

    #[error("Provider token endpoint response exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ExchangeError::Timeout
        } else {
            // The token URL carries no credentials; the secret travels in the form body.
            ExchangeError::Unreachable(e.without_url().to_string())
        }
    }
}

impl ExchangeError {
    fn status(&self) -> StatusCode {
        match self {
            ExchangeError::Denied { .. } | ExchangeError::Rejected { .. } => StatusCode::BAD_REQUEST,
            ExchangeError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ExchangeError::Unreachable(_)
            | ExchangeError::InvalidResponse { .. }
            | ExchangeError::ResponseTooLarge { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// OAuth-style error code handed to the CMS client.
    pub fn code(&self) -> &str {
        match self {
            ExchangeError::Denied { error, .. } | ExchangeError::Rejected { error, .. } => {
                error.as_str()
            }
            ExchangeError::Timeout => "provider_timeout",
            ExchangeError::Unreachable(_) => "provider_unreachable",
            ExchangeError::InvalidResponse { .. } => "provider_response_invalid",
            ExchangeError::ResponseTooLarge { .. } => "provider_response_too_large",
        }
    }

    pub fn description(&self) -> String {
        match self {
            ExchangeError::Denied {
                description: Some(description),
                ..
            }
            | ExchangeError::Rejected {
                description: Some(description),
                ..
            } => description.clone(),
            other => other.to_string(),
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::OriginRejected(_) => (StatusCode::FORBIDDEN, "origin_not_authorized"),
            AppError::UnsupportedProvider(_) => (StatusCode::BAD_REQUEST, "unsupported_provider"),
            AppError::MalformedCallback(_) => (StatusCode::BAD_REQUEST, "malformed_callback"),
            AppError::StateMismatch(_) => (StatusCode::BAD_REQUEST, "state_mismatch"),
            AppError::Exchange {
                provider,
                allowed_origins,
                source,
            } => {
                // The popup is a browser window; render a page that also tells the opener.
                let page = handshake::error_page(
                    provider,
                    allowed_origins,
                    source.code(),
                    &source.description(),
                );
                return (
                    source.status(),
                    [(header::CACHE_CONTROL, "no-store")],
                    Html(page),
                )
                    .into_response();
            }
        };

        let body = Json(ErrorResponse {
            code: code.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}
