use crate::db::models::{CitationNetwork, NetworkSummary};
use crate::errors::AppError;
use crate::routes::require_doi;
use crate::services::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use tracing::instrument;

#[derive(Serialize)]
pub struct NetworksResponse {
    pub networks: Vec<NetworkSummary>,
}

/// POST /generate-network
///
/// `depth` defaults to the configured depth and is clamped to the configured
/// maximum to bound traversal fan-out.
#[instrument(skip(state, body))]
pub async fn generate_network(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<CitationNetwork>, AppError> {
    let doi = require_doi(&body)?;

    let depth = match body.get("depth") {
        None | Some(serde_json::Value::Null) => state.config.graph.default_depth,
        Some(value) => value
            .as_u64()
            .ok_or_else(|| AppError::ValidationError("depth must be a non-negative integer".into()))?
            as usize,
    };
    let depth = depth.min(state.config.graph.max_depth);

    let network = state.networks.generate(doi, depth).await?;
    Ok(Json(network))
}

/// GET /networks
pub async fn list_networks(
    State(state): State<AppState>,
) -> Result<Json<NetworksResponse>, AppError> {
    let networks = state.store.list_networks().await?;
    Ok(Json(NetworksResponse { networks }))
}
