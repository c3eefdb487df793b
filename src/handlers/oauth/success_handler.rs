use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
};

use super::handshake::success_page;
use crate::models::AppState;

pub async fn success_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-store")],
        Html(success_page(
            &app_state.config.provider,
            &app_state.config.allowed_origins,
        )),
    )
}

#[cfg(test)]
mod tests {
    use crate::models::app_config::test_support::test_state;
    use crate::routes::router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_success_page_is_idempotent() {
        let app = router(test_state("https://github.com"));
        let mut bodies = Vec::new();

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(Request::builder().uri("/success").body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
            assert!(response.headers().get(header::SET_COOKIE).is_none());

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            bodies.push(String::from_utf8(bytes.to_vec()).unwrap());
        }

        assert_eq!(bodies[0], bodies[1]);
        assert!(bodies[0].contains("window.opener.postMessage"));
        assert!(bodies[0].contains("You may close this window"));
        assert!(bodies[0].contains(r#"var allowedOrigins = ["https://czargab18.github.io"];"#));
        assert!(bodies[0].contains("message.source !== window.opener"));
    }
}
