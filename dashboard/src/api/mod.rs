//! API module for the VPN dashboard
//!
//! Provides REST API endpoints for:
//! - Dashboard login
//! - Container status, start/stop/restart and logs
//! - Health checks and metrics
//!
//! Anything else is looked up in the static UI directory, falling back to a
//! JSON 404.

mod auth;
mod error;
mod handlers;

use std::any::Any;
use std::sync::Arc;

use axum::{
    handler::HandlerWithoutStateExt,
    http::{header, HeaderName, HeaderValue},
    middleware::from_extractor_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use auth::AuthenticatedUser;
pub use error::ApiError;
pub use handlers::health::mark_start;

const CSP_POLICY: &str =
    "default-src 'self'; style-src 'self' 'unsafe-inline'; script-src 'self'; img-src 'self' data:";

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Browser UI; `/` resolves to index.html
    let static_files = ServeDir::new(&state.config.web_static_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(not_found.into_service());

    Router::new()
        // Health check (no auth)
        .route("/health", get(handlers::health::health_check).fallback(not_found))
        // Prometheus metrics (no auth for scraping)
        .route("/metrics", get(crate::metrics::metrics_handler).fallback(not_found))
        .route("/api/login", post(handlers::auth::login).fallback(not_found))
        .nest("/api/vpn", vpn_routes(state.clone()))
        .fallback_service(static_files)
        .with_state(state)
}

/// Container routes. The token is checked for the whole prefix, so unknown
/// paths and wrong methods under it are rejected before they 404.
fn vpn_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(handlers::vpn::get_status).fallback(not_found))
        .route("/start", post(handlers::vpn::start).fallback(not_found))
        .route("/stop", post(handlers::vpn::stop).fallback(not_found))
        .route("/restart", post(handlers::vpn::restart).fallback(not_found))
        .route("/logs", get(handlers::vpn::get_logs).fallback(not_found))
        .fallback(not_found)
        .layer(from_extractor_with_state::<AuthenticatedUser, _>(state))
}

/// Wrap the router with tracing, request IDs, CORS, panic handling and security headers
pub fn with_middleware(router: Router) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");
    router
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CSP_POLICY),
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin),
        )
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::Internal("request handler panicked".into()).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::container::{ContainerName, ContainerOps, ContainerRuntime};
    use crate::remote::testing::{FakeTransport, Failure};
    use crate::remote::RemoteExecutor;

    const ADMIN_TOKEN: &str = "YWRtaW46YWRtaW4=";

    fn app(transport: &FakeTransport) -> Router {
        let config = AppConfig {
            vpn_server_host: "vpn.example.com".into(),
            web_static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/public").into(),
            ..AppConfig::default()
        };
        let container = ContainerOps::new(
            RemoteExecutor::new(Arc::new(transport.clone()), None),
            ContainerRuntime::Docker,
            ContainerName::parse(&config.vpn_container_name).unwrap(),
        );
        create_router(Arc::new(AppState { config, container }))
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post(uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        builder.body(body).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_login_issues_token() {
        let transport = FakeTransport::default();
        let (status, body) = send(
            app(&transport),
            post("/api/login", None, Some(json!({"username": "admin", "password": "admin"}))),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["token"], json!(ADMIN_TOKEN));
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_credentials() {
        let transport = FakeTransport::default();
        let (status, body) = send(
            app(&transport),
            post("/api/login", None, Some(json!({"username": "admin", "password": "nope"}))),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("token").is_none());
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_login_with_missing_fields_is_unauthorized() {
        let transport = FakeTransport::default();
        let (status, _) = send(app(&transport), post("/api/login", None, Some(json!({})))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_with_invalid_json_is_bad_request() {
        let transport = FakeTransport::default();
        let request = Request::builder()
            .method("POST")
            .uri("/api/login")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app(&transport), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_protected_route_token_errors_are_distinct() {
        let transport = FakeTransport::default();

        let (missing_status, missing) = send(app(&transport), get("/api/vpn/status", None)).await;
        // base64 of "admin:wrong"
        let (invalid_status, invalid) =
            send(app(&transport), get("/api/vpn/status", Some("YWRtaW46d3Jvbmc="))).await;

        assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
        assert_eq!(invalid_status, StatusCode::UNAUTHORIZED);
        assert_eq!(missing["error"], json!("Authentication token required"));
        assert_eq!(invalid["error"], json!("Invalid token"));
        assert_eq!(transport.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_status_running() {
        let transport = FakeTransport::stdout(
            "NAMES\tSTATUS\tPORTS\nopenvpn-server\tUp 3 hours\t0.0.0.0:1194->1194/udp",
        );
        let (status, body) = send(app(&transport), get("/api/vpn/status", Some(ADMIN_TOKEN))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("running"));
        assert_eq!(body["ports"], json!("0.0.0.0:1194->1194/udp"));
        assert_eq!(body["containerName"], json!("openvpn-server"));
        assert!(body["timestamp"].is_string());
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn test_status_not_found() {
        let transport = FakeTransport::stdout("NAMES\tSTATUS\tPORTS");
        let (status, body) = send(app(&transport), get("/api/vpn/status", Some(ADMIN_TOKEN))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("not_found"));
        assert_eq!(body["ports"], json!(""));
    }

    #[tokio::test]
    async fn test_status_nonzero_exit_is_server_error() {
        let transport = FakeTransport::exit(1, "Cannot connect to the Docker daemon");
        let (status, body) = send(app(&transport), get("/api/vpn/status", Some(ADMIN_TOKEN))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["details"], json!("Cannot connect to the Docker daemon"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_server_error() {
        let transport = FakeTransport::failing(Failure::Authenticate);
        let (status, body) = send(app(&transport), get("/api/vpn/status", Some(ADMIN_TOKEN))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
        assert!(body["details"].as_str().unwrap().contains("authentication rejected"));
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn test_start_success() {
        let transport = FakeTransport::stdout("openvpn-server\n");
        let (status, body) = send(app(&transport), post("/api/vpn/start", Some(ADMIN_TOKEN), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["output"], json!("openvpn-server"));
        assert_eq!(transport.executed(), vec!["docker start openvpn-server".to_string()]);
    }

    #[tokio::test]
    async fn test_stop_nonzero_exit_is_server_error() {
        let transport = FakeTransport::exit(1, "Error: No such container: openvpn-server");
        let (status, body) = send(app(&transport), post("/api/vpn/stop", Some(ADMIN_TOKEN), None)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["details"], json!("Error: No such container: openvpn-server"));
    }

    #[tokio::test]
    async fn test_restart_runs_restart() {
        let transport = FakeTransport::stdout("openvpn-server");
        let (status, _) = send(app(&transport), post("/api/vpn/restart", Some(ADMIN_TOKEN), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(transport.executed(), vec!["docker restart openvpn-server".to_string()]);
    }

    #[tokio::test]
    async fn test_logs_default_and_explicit_lines() {
        let transport = FakeTransport::stdout("Initialization Sequence Completed");

        let (status, body) = send(app(&transport), get("/api/vpn/logs", Some(ADMIN_TOKEN))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["logs"], json!("Initialization Sequence Completed"));
        assert!(body["timestamp"].is_string());

        let (status, _) = send(app(&transport), get("/api/vpn/logs?lines=10", Some(ADMIN_TOKEN))).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(
            transport.executed(),
            vec![
                "docker logs --tail 50 openvpn-server".to_string(),
                "docker logs --tail 10 openvpn-server".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_logs_ignore_exit_code() {
        let transport = FakeTransport::with_events(vec![
            crate::remote::ExecEvent::Stdout(b"partial".to_vec()),
            crate::remote::ExecEvent::ExitStatus(1),
        ]);
        let (status, body) = send(app(&transport), get("/api/vpn/logs", Some(ADMIN_TOKEN))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["logs"], json!("partial"));
    }

    #[tokio::test]
    async fn test_logs_rejects_non_numeric_lines() {
        let transport = FakeTransport::default();
        let (status, _) = send(
            app(&transport),
            get("/api/vpn/logs?lines=50;reboot", Some(ADMIN_TOKEN)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(transport.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let transport = FakeTransport::default();
        let (status, body) = send(app(&transport), get("/nope", None)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Route not found"));
    }

    #[tokio::test]
    async fn test_unknown_method_is_json_not_found() {
        let transport = FakeTransport::default();
        let (status, body) = send(app(&transport), post("/health", None, None)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Route not found"));

        let (status, body) = send(app(&transport), get("/api/login", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Route not found"));
    }

    #[tokio::test]
    async fn test_vpn_prefix_requires_token_before_not_found() {
        let transport = FakeTransport::default();

        // Wrong method on a known path
        let (status, body) = send(app(&transport), get("/api/vpn/start", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], json!("Authentication token required"));

        let (status, body) = send(app(&transport), get("/api/vpn/start", Some(ADMIN_TOKEN))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Route not found"));

        // Unknown path under the prefix
        let (status, _) = send(app(&transport), get("/api/vpn/anything", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(app(&transport), get("/api/vpn/anything", Some(ADMIN_TOKEN))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("Route not found"));

        assert_eq!(transport.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_root_serves_browser_ui() {
        let transport = FakeTransport::default();
        let response = app(&transport).oneshot(get("/", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8_lossy(&bytes);
        assert!(html.contains("app.js"));

        let (status, _) = send(app(&transport), get("/app.js", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logs_empty_lines_uses_default() {
        let transport = FakeTransport::stdout("ok");
        let (status, _) = send(app(&transport), get("/api/vpn/logs?lines=", Some(ADMIN_TOKEN))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            transport.executed(),
            vec!["docker logs --tail 50 openvpn-server".to_string()]
        );
    }

    #[tokio::test]
    async fn test_dropped_request_still_closes_session() {
        let transport = FakeTransport::delayed(std::time::Duration::from_millis(100), "openvpn-server");
        let request = app(&transport).oneshot(post("/api/vpn/restart", Some(ADMIN_TOKEN), None));

        // Client goes away while the command is still running
        let abandoned = tokio::time::timeout(std::time::Duration::from_millis(20), request).await;
        assert!(abandoned.is_err());
        assert_eq!(transport.close_count(), 0);

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert_eq!(transport.executed(), vec!["docker restart openvpn-server".to_string()]);
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn test_health_does_not_touch_remote() {
        let transport = FakeTransport::default();
        let (status, body) = send(app(&transport), get("/health", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
        assert_eq!(body["containerName"], json!("openvpn-server"));
        assert_eq!(transport.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_security_headers() {
        let transport = FakeTransport::default();
        let response = with_middleware(app(&transport))
            .oneshot(get("/health", None))
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert!(headers.contains_key("x-request-id"));
    }
}
