//! Anti-forgery `state` round trip without server-side storage: the value
//! sent to the provider is also set as a cookie scoped to the callback path,
//! and the two must match when the provider redirects back.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use oauth2::CsrfToken;

use crate::error::AppError;
use crate::models::AppConfig;

pub const STATE_COOKIE: &str = "cms_oauth_state";

/// Long enough for a user to finish logging in at the provider.
const STATE_COOKIE_MAX_AGE_MINUTES: i64 = 10;

pub fn issue(jar: CookieJar, config: &AppConfig, csrf_token: &CsrfToken) -> CookieJar {
    let cookie = Cookie::build((STATE_COOKIE, csrf_token.secret().clone()))
        .path(config.redirect_url.path().to_string())
        .http_only(true)
        .secure(config.state_cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(STATE_COOKIE_MAX_AGE_MINUTES));

    jar.add(cookie)
}

pub fn verify(jar: &CookieJar, returned_state: &str) -> Result<(), AppError> {
    let expected = jar
        .get(STATE_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or(AppError::StateMismatch("login session cookie is missing or expired"))?;

    if expected != returned_state {
        return Err(AppError::StateMismatch(
            "state parameter does not match this login session",
        ));
    }

    Ok(())
}

pub fn clear(jar: CookieJar, config: &AppConfig) -> CookieJar {
    jar.remove(Cookie::build(STATE_COOKIE).path(config.redirect_url.path().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::app_config::test_support::test_config;

    #[test]
    fn test_issued_cookie_attributes() {
        let config = test_config("https://github.com");
        let token = CsrfToken::new("state-1".to_string());
        let jar = issue(CookieJar::new(), &config, &token);

        let cookie = jar.get(STATE_COOKIE).unwrap();
        assert_eq!(cookie.value(), "state-1");
        assert_eq!(cookie.path(), Some("/callback"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_verify_accepts_matching_state() {
        let jar = CookieJar::new().add(Cookie::new(STATE_COOKIE, "state-1"));
        assert!(verify(&jar, "state-1").is_ok());
    }

    #[test]
    fn test_verify_rejects_mismatch_and_missing_cookie() {
        let jar = CookieJar::new().add(Cookie::new(STATE_COOKIE, "state-1"));
        assert!(matches!(
            verify(&jar, "state-2"),
            Err(AppError::StateMismatch(_))
        ));
        assert!(matches!(
            verify(&CookieJar::new(), "state-1"),
            Err(AppError::StateMismatch(_))
        ));
    }
}
