use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use oauth2::CsrfToken;
use oauth2::url::Url;
use tracing::{debug, info};

use super::{found, state_cookie};
use crate::error::AppError;
use crate::models::oauth::AuthParams;
use crate::models::{AppConfig, AppState};

pub async fn auth_handler(
    State(app_state): State<AppState>,
    Query(params): Query<AuthParams>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let config = &app_state.config;

    if let Some(provider) = params.provider.as_deref() {
        if provider != config.provider {
            return Err(AppError::UnsupportedProvider(provider.to_string()));
        }
    }
    if let Some(scope) = params.scope.as_deref() {
        debug!(requested = scope, "ignoring client scope, using configured scopes");
    }

    let csrf_token = CsrfToken::new_random();
    let url = authorization_url(config, &csrf_token);
    let jar = state_cookie::issue(jar, config, &csrf_token);

    info!(
        provider = %config.provider,
        site_id = params.site_id.as_deref().unwrap_or("-"),
        "redirecting to identity provider"
    );

    Ok((jar, found(url.as_str())).into_response())
}

pub fn authorization_url(config: &AppConfig, csrf_token: &CsrfToken) -> Url {
    let mut url = config.authorize_url.clone();

    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", config.redirect_url.as_str())
        .append_pair("response_type", "code")
        .append_pair("scope", &config.scopes.join(","))
        .append_pair("state", csrf_token.secret());

    url
}
