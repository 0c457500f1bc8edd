//! Stdio transport for agents that launch the planner as a subprocess.

use std::sync::Arc;

use rmcp::service::ServiceExt;
use rmcp::transport::io::stdio;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::handler::{AppState, PlannerServer};
use crate::{AppError, Result};

/// Serve the MCP tools over stdin/stdout until the client disconnects or
/// `ct` fires.
///
/// # Errors
///
/// Returns `AppError::Mcp` if the handshake or the session fails.
pub async fn serve_stdio(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let server = PlannerServer::new(state);

    info!("starting stdio MCP transport");
    let service = server
        .serve_with_ct(stdio(), ct)
        .await
        .map_err(|err| AppError::Mcp(format!("stdio transport failed: {err}")))?;

    service
        .waiting()
        .await
        .map_err(|err| AppError::Mcp(format!("stdio service error: {err}")))?;

    info!("stdio MCP transport shut down");
    Ok(())
}
