// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers and routing for the relay service.

use crate::config::{Config, SiteConfig};
use crate::error::{RelayError, Result};
use crate::metrics::RelayMetrics;
use crate::models::{
    Ack, HealthResponse, RegistrationRequest, RegistrationResponse, SubmissionRequest,
};
use crate::notifier::Notifier;
use crate::relay::RelayService;
use crate::resolver::DirectoryResolver;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Shared application state.
pub struct AppState {
    pub relay: RelayService,
    pub resolver: DirectoryResolver,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, notifier: Arc<dyn Notifier>, metrics: RelayMetrics) -> Self {
        let relay = RelayService::new(&config, notifier, metrics);
        let resolver = DirectoryResolver::new(relay.registry().clone());
        Self {
            relay,
            resolver,
            config,
        }
    }
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let static_files = static_service(&state.config.site);

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/webhook", post(submit_direct))
        .route("/api/dualhook", post(register_directory))
        .route("/api/:directory/webhook", post(submit_via_directory))
        .route("/:directory", get(directory_page));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics));
    }

    router
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Built assets, falling back to the shell for client-side routes.
fn static_service(site: &SiteConfig) -> ServeDir<ServeFile> {
    ServeDir::new(&site.static_dir).fallback(ServeFile::new(site.shell_path()))
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "webhook-relay",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.relay.metrics().render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => RelayError::Unexpected(e.to_string()).into_response(),
    }
}

/// `POST /api/webhook`
pub async fn submit_direct(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: std::result::Result<Json<SubmissionRequest>, JsonRejection>,
) -> Result<Json<Ack>> {
    let Json(req) = payload.map_err(invalid_body)?;
    let ack = state.relay.submit_direct(addr.ip(), &req).await?;
    Ok(Json(ack))
}

/// `POST /api/:directory/webhook`
pub async fn submit_via_directory(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(directory): Path<String>,
    payload: std::result::Result<Json<SubmissionRequest>, JsonRejection>,
) -> Result<Json<Ack>> {
    let Json(req) = payload.map_err(invalid_body)?;
    let ack = state
        .relay
        .submit_via_directory(addr.ip(), &directory, &req)
        .await?;
    Ok(Json(ack))
}

/// `POST /api/dualhook`
pub async fn register_directory(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: std::result::Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<RegistrationResponse>> {
    let Json(req) = payload.map_err(invalid_body)?;
    let page_base = page_base(&headers, &state.config);
    let result = state
        .relay
        .register_directory(addr.ip(), &req, &page_base)
        .await?;
    Ok(Json(result.into()))
}

/// `GET /:directory`
///
/// Registered directories get the shell with their context injected; any
/// other segment is handed to static routing untouched.
pub async fn directory_page(
    State(state): State<Arc<AppState>>,
    Path(directory): Path<String>,
    request: Request,
) -> Response {
    let Some(ctx) = state.resolver.resolve(&directory).await else {
        debug!(segment = %directory, "Not a directory, falling through");
        return match static_service(&state.config.site).oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        };
    };

    let shell_path = state.config.site.shell_path();
    match tokio::fs::read_to_string(&shell_path).await {
        Ok(shell) => Html(ctx.inject(&shell, &state.config.site.title)).into_response(),
        Err(e) => {
            error!(path = %shell_path.display(), error = %e, "Failed to read application shell");
            RelayError::Unexpected(e.to_string()).into_response()
        }
    }
}

/// Origin the new page URL is built on: the request `Origin`, else the
/// configured public URL.
fn page_base(headers: &HeaderMap, config: &Config) -> String {
    headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| config.public_url.clone())
        .unwrap_or_default()
}

fn invalid_body(rejection: JsonRejection) -> RelayError {
    debug!(error = %rejection, "Rejected request body");
    RelayError::invalid(rejection.body_text())
}
