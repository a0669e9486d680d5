pub mod api;
pub mod types;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use rust_embed::Embed;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::health::HealthServer;
use crate::policy::PolicyClient;
use api::AppState;

#[derive(Embed)]
#[folder = "static/"]
struct StaticAssets;

pub async fn run(
    config: Config,
    health_server: HealthServer,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> Result<()> {
    info!(
        port = config.server_port,
        opa_url = %config.get_opa_url(),
        checks = ?config.checks,
        "Starting dashboard server"
    );

    let policy = PolicyClient::new(config.get_opa_url())
        .context("Failed to create policy engine client")?;
    let cookie_key = build_cookie_key(config.session_secret.as_deref())?;

    let state = AppState {
        policy: Arc::new(policy),
        checks: config.checks.clone(),
        cookie_key,
    };

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE]);

    // Build router
    let app = Router::new()
        .route("/healthz", get(api::healthz))
        .route("/version", get(api::get_version))
        // API routes
        .route("/api/v1/instances", post(api::list_instances))
        .route("/api/v1/instances/{id}", get(api::get_instance))
        .route(
            "/api/v1/instances/{id}/enable-imdsv2",
            post(api::enable_imdsv2),
        )
        .route("/logout", post(api::logout))
        // Static UI
        .route("/", get(serve_index))
        .route("/style.css", get(serve_css))
        .route("/app.js", get(serve_js))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(addr = %addr, "Server listening");

    // Mark as ready
    health_server.set_ready(true);

    // Run server with graceful shutdown (with ConnectInfo for remote addr logging)
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown.changed().await;
        info!("Server shutting down");
    })
    .await?;

    Ok(())
}

/// Decode the configured cookie key, or generate a per-process key
fn build_cookie_key(secret: Option<&str>) -> Result<Key> {
    match secret {
        Some(secret) => {
            let bytes = BASE64_STANDARD
                .decode(secret)
                .context("SESSION_SECRET is not valid base64")?;
            Key::try_from(bytes.as_slice())
                .map_err(|_| anyhow::anyhow!("SESSION_SECRET must decode to at least 64 bytes"))
        }
        None => {
            warn!("SESSION_SECRET not set, generating a random session key (sessions reset on restart)");
            Ok(Key::generate())
        }
    }
}

async fn serve_index() -> impl IntoResponse {
    match StaticAssets::get("index.html") {
        Some(content) => Html(
            std::str::from_utf8(content.data.as_ref())
                .unwrap_or("")
                .to_string(),
        )
        .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn serve_css() -> impl IntoResponse {
    match StaticAssets::get("style.css") {
        Some(content) => (
            [(header::CONTENT_TYPE, "text/css")],
            std::str::from_utf8(content.data.as_ref())
                .unwrap_or("")
                .to_string(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn serve_js() -> impl IntoResponse {
    match StaticAssets::get("app.js") {
        Some(content) => (
            [(header::CONTENT_TYPE, "application/javascript")],
            std::str::from_utf8(content.data.as_ref())
                .unwrap_or("")
                .to_string(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}
