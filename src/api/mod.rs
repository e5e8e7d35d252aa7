//! HTTP API for the search agent.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /chat` - Answer one message, `{"message": ...}` -> `{"response": ...}`
//! - `/` - Static frontend, when the configured directory exists

mod routes;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::config::Config;

/// Shared application state.
pub struct AppState {
    pub agent: Agent,
}

/// Build the router: API routes, CORS, request tracing and the static
/// frontend fallback.
pub fn router(state: Arc<AppState>, frontend_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/api/health", get(routes::health))
        .route("/chat", post(routes::chat))
        .with_state(state);

    if frontend_dir.is_dir() {
        info!("Serving frontend from {}", frontend_dir.display());
        app = app.fallback_service(ServeDir::new(frontend_dir).append_index_html_on_directories(true));
    } else {
        warn!("Frontend directory not found at {}", frontend_dir.display());
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let frontend_dir = config.frontend_dir.clone();
    let addr = format!("{}:{}", config.host, config.port);

    let agent = Agent::new(config)?;
    if agent.tools().is_empty() {
        warn!("No tools registered; the model can only answer directly");
    }
    let tools = agent
        .tools()
        .list_tools()
        .into_iter()
        .map(|t| t.name)
        .collect::<Vec<_>>();
    info!("Registered {} tools: {}", agent.tools().len(), tools.join(", "));

    let state = Arc::new(AppState { agent });
    let app = router(state, &frontend_dir);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
