use serde::Deserialize;

/// Query sent by the CMS client when it opens the login popup.
#[derive(Debug, Deserialize)]
pub struct AuthParams {
    pub provider: Option<String>,
    pub scope: Option<String>,
    pub site_id: Option<String>,
}

/// Query the provider appends when it redirects back. Holds the
/// authorization code, so it deliberately has no `Debug` impl.
#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Body of the provider's token endpoint. GitHub reports failures with
/// HTTP 200 and an `error` field, so the status alone is not trusted.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum TokenEndpointResponse {
    Error {
        error: String,
        error_description: Option<String>,
    },
    Token {
        access_token: String,
    },
}
