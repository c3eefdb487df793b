use oauth2::{AccessToken, AuthorizationCode};
use reqwest::header::ACCEPT;
use tracing::{debug, warn};

use crate::error::ExchangeError;
use crate::models::AppState;
use crate::models::oauth::TokenEndpointResponse;

/// Token responses are a few hundred bytes; anything past this is not one.
pub const MAX_TOKEN_RESPONSE_BYTES: usize = 16 * 1024;

/// Trades a single-use authorization code for an access token. Performs
/// exactly one request, bounded by the client's timeout, and never retries:
/// a code that has been presented once is spent.
pub async fn exchange_code(
    app_state: &AppState,
    code: &AuthorizationCode,
    state: &str,
) -> Result<AccessToken, ExchangeError> {
    let config = &app_state.config;

    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.secret().as_str()),
        ("code", code.secret().as_str()),
        ("redirect_uri", config.redirect_url.as_str()),
        ("grant_type", "authorization_code"),
        ("state", state),
    ];

    let mut response = app_state
        .http
        .post(config.token_url.clone())
        .header(ACCEPT, "application/json")
        .form(&params)
        .send()
        .await?;

    let status = response.status();
    if response
        .content_length()
        .is_some_and(|len| len > MAX_TOKEN_RESPONSE_BYTES as u64)
    {
        warn!(status = status.as_u16(), "token endpoint response exceeds size limit");
        return Err(ExchangeError::ResponseTooLarge {
            limit: MAX_TOKEN_RESPONSE_BYTES,
        });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > MAX_TOKEN_RESPONSE_BYTES {
            warn!(status = status.as_u16(), "token endpoint response exceeds size limit");
            return Err(ExchangeError::ResponseTooLarge {
                limit: MAX_TOKEN_RESPONSE_BYTES,
            });
        }
        body.extend_from_slice(&chunk);
    }

    match serde_json::from_slice::<TokenEndpointResponse>(&body) {
        Ok(TokenEndpointResponse::Token { access_token }) if !access_token.is_empty() => {
            debug!(status = status.as_u16(), "token endpoint issued an access token");
            Ok(AccessToken::new(access_token))
        }
        Ok(TokenEndpointResponse::Error {
            error,
            error_description,
        }) => {
            warn!(
                status = status.as_u16(),
                error = %error,
                "token endpoint rejected the authorization code"
            );
            Err(ExchangeError::Rejected {
                error,
                description: error_description,
            })
        }
        _ => {
            warn!(
                status = status.as_u16(),
                "token endpoint returned an unrecognized body"
            );
            Err(ExchangeError::InvalidResponse {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::app_config::test_support::{TEST_CLIENT_SECRET, test_config, test_state};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN_PATH: &str = "/login/oauth/access_token";

    #[tokio::test]
    async fn test_sends_code_and_secret_as_form() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(header("accept", "application/json"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc123"))
            .and(body_string_contains(format!("client_secret={TEST_CLIENT_SECRET}")))
            .and(body_string_contains("client_id=client-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok_xyz",
                "token_type": "bearer",
            })))
            .expect(1)
            .mount(&provider)
            .await;

        let token = exchange_code(
            &test_state(&provider.uri()),
            &AuthorizationCode::new("abc123".to_string()),
            "state-1",
        )
        .await
        .unwrap();

        assert_eq!(token.secret(), "tok_xyz");
    }

    #[tokio::test]
    async fn test_error_payload_with_success_status_is_rejection() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired.",
            })))
            .expect(1)
            .mount(&provider)
            .await;

        let err = exchange_code(
            &test_state(&provider.uri()),
            &AuthorizationCode::new("stale".to_string()),
            "state-1",
        )
        .await
        .unwrap_err();

        match err {
            ExchangeError::Rejected { error, description } => {
                assert_eq!(error, "bad_verification_code");
                assert!(description.unwrap().contains("expired"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_invalid_response() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>maintenance</html>"))
            .expect(1)
            .mount(&provider)
            .await;

        let err = exchange_code(
            &test_state(&provider.uri()),
            &AuthorizationCode::new("abc123".to_string()),
            "state-1",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExchangeError::InvalidResponse { status: 503 }));
    }

    #[tokio::test]
    async fn test_oversized_body_is_refused() {
        let provider = MockServer::start().await;
        let padding = "x".repeat(MAX_TOKEN_RESPONSE_BYTES);
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok_xyz",
                "padding": padding,
            })))
            .expect(1)
            .mount(&provider)
            .await;

        let err = exchange_code(
            &test_state(&provider.uri()),
            &AuthorizationCode::new("abc123".to_string()),
            "state-1",
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ExchangeError::ResponseTooLarge {
                limit: MAX_TOKEN_RESPONSE_BYTES
            }
        ));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "late" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&provider)
            .await;

        let mut config = test_config(&provider.uri());
        config.token_exchange_timeout = Duration::from_millis(200);
        let app_state = AppState::new(config).unwrap();

        let err = exchange_code(
            &app_state,
            &AuthorizationCode::new("abc123".to_string()),
            "state-1",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExchangeError::Timeout));
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        // Nothing listens on the discard port.
        let app_state = test_state("http://127.0.0.1:9");

        let err = exchange_code(
            &app_state,
            &AuthorizationCode::new("abc123".to_string()),
            "state-1",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExchangeError::Unreachable(_)));
    }
}
