//! REST API and the combined HTTP listener.
//!
//! Task CRUD lives under `/tasks`, the scheduling engine under
//! `/analytics`, and the MCP streamable-HTTP endpoint under `/mcp`.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::mcp::handler::{AppState, PlannerServer};
use crate::{AppError, Result};

pub mod analytics;
pub mod error;
pub mod tasks;

/// Shared state extractor type for every route.
pub type SharedState = Arc<AppState>;

async fn health() -> &'static str {
    "ok"
}

/// REST routes without the MCP endpoint.
#[must_use]
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/tasks", tasks::routes())
        .nest("/analytics", analytics::routes())
        .with_state(state)
}

/// Serve the REST API and the MCP endpoint on `listener` until `ct` fires.
///
/// Every MCP session gets its own [`PlannerServer`] over the same state.
///
/// # Errors
///
/// Returns `AppError::Io` if the server stops with an I/O error.
pub async fn serve_http(
    listener: TcpListener,
    state: SharedState,
    ct: CancellationToken,
) -> Result<()> {
    let mcp_state = Arc::clone(&state);
    let mcp = StreamableHttpService::new(
        move || Ok(PlannerServer::new(Arc::clone(&mcp_state))),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    let app = router(state).nest_service("/mcp", mcp);

    let addr = listener.local_addr()?;
    info!(%addr, "serving HTTP API and MCP endpoint");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("HTTP server error: {err}")))?;

    info!("HTTP server shut down");
    Ok(())
}
