use axum::{Router, extract::Request, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::oauth::{SUCCESS_PATH, auth_handler, callback_handler, success_handler};
use crate::middleware::cors_gate;
use crate::models::AppState;

pub fn router(app_state: AppState) -> Router {
    let routes = Router::new()
        .route("/auth", get(auth_handler))
        .route("/callback", get(callback_handler))
        .route(SUCCESS_PATH, get(success_handler))
        .with_state(app_state.clone());

    // Spans record the path only: the callback query carries the authorization code.
    cors_gate::apply(routes, &app_state).layer(TraceLayer::new_for_http().make_span_with(
        |request: &Request| {
            tracing::info_span!("request", method = %request.method(), path = request.uri().path())
        },
    ))
}
