use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use http::{HeaderName, HeaderValue, Method, header};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{config::Config, handlers, state::AppState};

/// Maximum accepted request body size.
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(Duration::from_secs(86400));

    // Credentials cannot be combined with a wildcard origin.
    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

/// Builds the HTTP + WebSocket router.
pub fn build_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/chips", get(handlers::chips::list_chips))
        .route("/api/chips/connect", post(handlers::chips::connect_chip))
        .route(
            "/api/chips/{chip_id}",
            get(handlers::chips::get_chip).delete(handlers::chips::disconnect_chip),
        )
        .route(
            "/api/chips/{chip_id}/send-message",
            post(handlers::chips::send_message),
        )
        .layer(CompressionLayer::new());

    Router::new()
        .merge(api_routes)
        .route("/ws", get(handlers::ws::ws_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::INFO))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// Serves the application on an already bound listener.
pub async fn run(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let app = build_app(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Binds the configured address and serves until the process exits.
pub async fn start(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(&config);

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;

    tracing::info!("🚀 ChipForce API listening on http://{}", addr);
    tracing::info!("🌐 Environment: {}", config.environment);
    tracing::info!("🔗 Health check: http://localhost:{}/health", addr.port());
    tracing::info!(
        "⏱️ QR phase after {:?}, connected phase after {:?}",
        config.qr_delay,
        config.connect_delay
    );
    tracing::info!("📱 Ready to connect chips!");

    run(listener, state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> (AppState, Router) {
        let state = AppState::new(&Config::default());
        (state.clone(), build_app(state))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_sessions_and_version() {
        let (_, app) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );

        let body = read_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["activeSessions"], 0);
        assert_eq!(body["connections"], 0);
        assert_eq!(body["environment"], "development");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["uptime"].is_number());
        assert!(body["memory"]["rss"].is_number());
    }

    #[tokio::test]
    async fn preflight_allows_configured_origin() {
        let (_, app) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/chips/connect")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:5173"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connect_then_duplicate_conflicts() {
        let (state, app) = app();
        let payload = json!({ "chipId": "c1", "name": "Alice", "number": "+1555" });

        let response = app
            .clone()
            .oneshot(post_json("/api/chips/connect", payload.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["chipId"], "c1");
        assert_eq!(body["sessionName"], "chip_c1");
        assert!(body["message"].is_string());

        let response = app
            .oneshot(post_json("/api/chips/connect", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Chip already has an active session");

        assert_eq!(state.registry.len().await, 1);
    }

    #[tokio::test]
    async fn chip_id_is_opaque() {
        let (state, app) = app();
        for chip_id in ["chip 1", "çhip", "a/b", "c1:x"] {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/chips/connect",
                    json!({ "chipId": chip_id, "name": "Alice", "number": "+1555" }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "chipId {chip_id:?}");
        }
        assert_eq!(state.registry.len().await, 4);

        let response = app
            .oneshot(Request::builder().uri("/api/chips/chip%201").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["id"], "chip 1");
        assert_eq!(body["sessionName"], "chip_chip 1");
    }

    #[tokio::test]
    async fn body_rejections_are_json_errors() {
        let (state, app) = app();

        let malformed = Request::builder()
            .method("POST")
            .uri("/api/chips/connect")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{"))
            .unwrap();
        let missing_field = post_json(
            "/api/chips/connect",
            json!({ "name": "Alice", "number": "+1555" }),
        );

        for request in [malformed, missing_field] {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                response.headers().get(header::CONTENT_TYPE).unwrap(),
                "application/json"
            );
            let body = read_json(response).await;
            assert!(body["error"].as_str().is_some_and(|msg| !msg.is_empty()));
        }
        assert!(state.registry.is_empty().await);
    }

    #[tokio::test]
    async fn send_to_unknown_chip_is_not_found_before_body_checks() {
        let (_, app) = app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/chips/ghost/send-message",
                json!({ "to": "", "message": "x" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Chip not found or not connected");

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chips/ghost/send-message")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn send_with_empty_recipient_is_rejected_once_connected() {
        let (_, app) = app();
        app.clone()
            .oneshot(post_json(
                "/api/chips/connect",
                json!({ "chipId": "c1", "name": "Alice", "number": "+1555" }),
            ))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(9)).await;

        let response = app
            .oneshot(post_json(
                "/api/chips/c1/send-message",
                json!({ "to": "", "message": "x" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(!body["error"].as_str().unwrap().ends_with('\n'));
    }

    #[tokio::test]
    async fn connect_rejects_empty_name() {
        let (_, app) = app();
        let response = app
            .oneshot(post_json(
                "/api/chips/connect",
                json!({ "chipId": "c1", "name": "", "number": "+1555" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn send_message_requires_connected_chip() {
        let (_, app) = app();
        let payload = json!({ "to": "+1666", "message": "hello" });

        let response = app
            .clone()
            .oneshot(post_json("/api/chips/c1/send-message", payload.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Chip not found or not connected");
        assert!(body.get("messageId").is_none());

        app.clone()
            .oneshot(post_json(
                "/api/chips/connect",
                json!({ "chipId": "c1", "name": "Alice", "number": "+1555" }),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(post_json("/api/chips/c1/send-message", payload.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        tokio::time::sleep(Duration::from_secs(9)).await;

        let response = app
            .oneshot(post_json("/api/chips/c1/send-message", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "sent");
        assert!(body["messageId"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn get_list_and_delete_chip() {
        let (_, app) = app();
        app.clone()
            .oneshot(post_json(
                "/api/chips/connect",
                json!({ "chipId": "c1", "name": "Alice", "number": "+1555" }),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/chips/c1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["id"], "c1");
        assert_eq!(body["status"], "initializing");
        assert!(body["detail"].is_null());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/chips").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["sessions"][0]["sessionName"], "chip_c1");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/chips/c1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/api/chips/c1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
