//! HTTP application assembly.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ConsultConfig;
use crate::export::ProposalExporter;
use crate::export::routes::{ExportRouteState, export_routes};
use crate::llm::LlmProvider;
use crate::profile::ProfileCollector;
use crate::profile::routes::{ProfileRouteState, profile_routes};
use crate::session::routes::{SessionRouteState, session_routes};
use crate::session::{SessionRegistry, SessionSettings};
use crate::store::Database;

/// The long-lived services behind the routes.
#[derive(Clone)]
pub struct Services {
    pub profiles: Arc<ProfileCollector>,
    pub sessions: Arc<SessionRegistry>,
    pub exporter: Arc<ProposalExporter>,
}

impl Services {
    pub fn new(db: Arc<dyn Database>, llm: Arc<dyn LlmProvider>, config: &ConsultConfig) -> Self {
        let profiles = Arc::new(ProfileCollector::new(db));
        let sessions = Arc::new(SessionRegistry::new(
            Arc::clone(&profiles),
            Arc::clone(&llm),
            SessionSettings::from(config),
        ));
        let exporter = Arc::new(ProposalExporter::new(llm, config.max_tokens));
        Self {
            profiles,
            sessions,
            exporter,
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Every route, with tracing and permissive CORS.
pub fn app(services: &Services) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(profile_routes(ProfileRouteState {
            collector: Arc::clone(&services.profiles),
            sessions: Arc::clone(&services.sessions),
        }))
        .merge(session_routes(SessionRouteState {
            registry: Arc::clone(&services.sessions),
        }))
        .merge(export_routes(ExportRouteState {
            registry: Arc::clone(&services.sessions),
            exporter: Arc::clone(&services.exporter),
        }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn unavailable() -> impl IntoResponse {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({
            "error": "Service Temporarily Unavailable",
            "hint": "The service failed to start. Please reload the page in a moment.",
        })),
    )
}

/// Served instead of [`app`] when startup fails: every request gets a 503.
pub fn unavailable_router() -> Router {
    Router::new()
        .fallback(unavailable)
        .layer(TraceLayer::new_for_http())
}

/// Bind `0.0.0.0:port` and serve until the process exits.
pub async fn serve(router: Router, port: u16) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "HTTP server listening");
    axum::serve(listener, router).await
}
