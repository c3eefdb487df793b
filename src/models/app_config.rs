use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use oauth2::ClientSecret;
use oauth2::url::Url;
use thiserror::Error;

const DEFAULT_PROVIDER: &str = "github";
const DEFAULT_PROVIDER_BASE_URL: &str = "https://github.com";
const DEFAULT_AUTHORIZE_PATH: &str = "/login/oauth/authorize";
const DEFAULT_TOKEN_PATH: &str = "/login/oauth/access_token";
const DEFAULT_SCOPES: &str = "repo,user";
const DEFAULT_ORIGINS: &str = "https://czargab18.github.io";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TOKEN_EXCHANGE_TIMEOUT_SECS: u64 = 10;

/// Errors raised while loading configuration. Any of these stops the service
/// before it binds its listener.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not found")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: ClientSecret,
    /// Provider name used by the CMS client in `authorization:<provider>:...` messages.
    pub provider: String,
    pub authorize_url: Url,
    pub token_url: Url,
    pub scopes: Vec<String>,
    /// Absolute URL of this service's `/callback` route, registered with the provider.
    pub redirect_url: Url,
    pub allowed_origins: Vec<String>,
    pub port: u16,
    pub token_exchange_timeout: Duration,
    pub state_cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        use dotenvy::dotenv;
        use std::env;

        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values
    /// are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let client_id = required("OAUTH_CLIENT_ID")?;
        let client_secret = ClientSecret::new(required("OAUTH_CLIENT_SECRET")?);
        let provider = get("OAUTH_PROVIDER").unwrap_or_else(|| DEFAULT_PROVIDER.to_string());

        let base_url = get("GIT_HOSTNAME").unwrap_or_else(|| DEFAULT_PROVIDER_BASE_URL.to_string());
        let base_url = base_url.trim_end_matches('/');
        let authorize_path =
            get("OAUTH_AUTHORIZE_PATH").unwrap_or_else(|| DEFAULT_AUTHORIZE_PATH.to_string());
        let token_path = get("OAUTH_TOKEN_PATH").unwrap_or_else(|| DEFAULT_TOKEN_PATH.to_string());
        let authorize_url = parse_url("OAUTH_AUTHORIZE_PATH", &format!("{base_url}{authorize_path}"))?;
        let token_url = parse_url("OAUTH_TOKEN_PATH", &format!("{base_url}{token_path}"))?;

        let scopes = split_list(&get("SCOPES").unwrap_or_else(|| DEFAULT_SCOPES.to_string()));

        let redirect_url = parse_url("REDIRECT_URL", &required("REDIRECT_URL")?)?;

        let allowed_origins: Vec<String> =
            split_list(&get("ORIGINS").unwrap_or_else(|| DEFAULT_ORIGINS.to_string()))
                .into_iter()
                .map(|origin| origin.trim_end_matches('/').to_string())
                .collect();
        if let Some(bad) = allowed_origins
            .iter()
            .find(|origin| HeaderValue::from_str(origin).is_err())
        {
            return Err(ConfigError::Invalid {
                key: "ORIGINS",
                reason: format!("{bad:?} is not a valid header value"),
            });
        }

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match get("TOKEN_EXCHANGE_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        key: "TOKEN_EXCHANGE_TIMEOUT_SECS",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Ok(secs) => secs,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        key: "TOKEN_EXCHANGE_TIMEOUT_SECS",
                        reason: e.to_string(),
                    });
                }
            },
            None => DEFAULT_TOKEN_EXCHANGE_TIMEOUT_SECS,
        };

        let state_cookie_secure = match get("STATE_COOKIE_SECURE") {
            Some(raw) => parse_bool("STATE_COOKIE_SECURE", &raw)?,
            None => redirect_url.scheme() == "https",
        };

        Ok(Self {
            client_id,
            client_secret,
            provider,
            authorize_url,
            token_url,
            scopes,
            redirect_url,
            allowed_origins,
            port,
            token_exchange_timeout: Duration::from_secs(timeout_secs),
            state_cookie_secure,
        })
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("{value:?}: {e}"),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            reason: format!("{value:?} is not a boolean"),
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Per-process state shared by every handler. Holds no per-request data:
/// the HTTP client is only a connection pool.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.token_exchange_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }
}
