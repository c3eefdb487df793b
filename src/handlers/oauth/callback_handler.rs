use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use oauth2::url::form_urlencoded;
use oauth2::{AccessToken, AuthorizationCode};
use tracing::{info, warn};

use super::token_exchange::exchange_code;
use super::{SUCCESS_PATH, found, state_cookie};
use crate::error::{AppError, ExchangeError};
use crate::models::AppState;
use crate::models::oauth::CallbackParams;

/// Validates the provider's redirect, exchanges the code and hands the token
/// to the success page. Everything that can be checked locally is checked
/// before the outbound call.
pub async fn callback_handler(
    State(app_state): State<AppState>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let config = &app_state.config;

    if let Some(error) = params.error {
        warn!(provider = %config.provider, error = %error, "provider denied authorization");
        return Err(AppError::exchange(
            config,
            ExchangeError::Denied {
                error,
                description: params.error_description,
            },
        ));
    }

    let code = match params.code {
        Some(code) if !code.trim().is_empty() => AuthorizationCode::new(code),
        _ => return Err(AppError::MalformedCallback("missing authorization code")),
    };

    let state = params
        .state
        .filter(|state| !state.is_empty())
        .ok_or(AppError::StateMismatch("missing state parameter"))?;
    state_cookie::verify(&jar, &state)?;

    let token = exchange_code(&app_state, &code, &state)
        .await
        .map_err(|e| AppError::exchange(config, e))?;

    info!(provider = %config.provider, "authorization code exchanged");

    let jar = state_cookie::clear(jar, config);
    Ok((jar, found(&success_location(&token))).into_response())
}

/// The token rides in the fragment, which browsers never send to servers,
/// so it stays out of access logs and referrers.
fn success_location(token: &AccessToken) -> String {
    let encoded: String = form_urlencoded::byte_serialize(token.secret().as_bytes()).collect();
    format!("{SUCCESS_PATH}#token={encoded}")
}
