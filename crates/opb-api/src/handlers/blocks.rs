//! Stored block lookups.

use crate::{ApiResult, AppState};
use axum::extract::{Path, State};
use axum::Json;
use opb_chain::{BlockFs, Hash};

/// GET /block/:id
///
/// The path segment is a height when it parses as an integer, otherwise a
/// block hash.
pub async fn block_by_height_or_hash(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BlockFs>> {
    let id = id.trim();
    let block = match id.parse::<u64>() {
        Ok(height) => state.ledger.block_by_height(height)?,
        Err(_) => {
            let hash = Hash::from_hex(id)
                .map_err(|e| crate::ApiError::BadRequest(e.to_string()))?;
            state.ledger.block_by_hash(&hash)?
        }
    };
    Ok(Json(block))
}
