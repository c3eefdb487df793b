pub mod auth_handler;
pub mod callback_handler;
pub mod handshake;
pub mod state_cookie;
pub mod success_handler;
pub mod token_exchange;

pub use auth_handler::auth_handler;
pub use callback_handler::callback_handler;
pub use success_handler::success_handler;

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

pub const SUCCESS_PATH: &str = "/success";

/// `302 Found`, which is what the CMS popup flow expects on every hop.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
