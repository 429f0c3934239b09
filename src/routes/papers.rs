use crate::db::models::PaperRecord;
use crate::errors::AppError;
use crate::services::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

/// GET /paper/{id}
pub async fn get_paper(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaperRecord>, AppError> {
    let record = state.papers.get(&id).await?;
    Ok(Json(record))
}
