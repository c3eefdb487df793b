//! Origin allow list in front of every route.
//!
//! Requests without an `Origin` header (curl, the provider's top-level
//! redirect) pass. Requests from a listed origin pass and receive CORS
//! headers with credentials allowed. Anything else is answered with an
//! explicit 403 before routing.

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::debug;

use crate::error::AppError;
use crate::models::{AppConfig, AppState};

pub async fn cors_gate(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|origin| app_state.config.is_origin_allowed(origin))
            .unwrap_or(false);

        if !allowed {
            let origin = String::from_utf8_lossy(origin.as_bytes()).into_owned();
            debug!(origin = %origin, path = request.uri().path(), "rejected request from unlisted origin");
            return Err(AppError::OriginRejected(origin));
        }
    }

    Ok(next.run(request).await)
}

pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_credentials(true)
}

/// Wraps `router` so the gate runs first, then the CORS headers layer.
pub fn apply(router: Router, app_state: &AppState) -> Router {
    router
        .layer(cors_layer(&app_state.config))
        .layer(middleware::from_fn_with_state(app_state.clone(), cors_gate))
}
