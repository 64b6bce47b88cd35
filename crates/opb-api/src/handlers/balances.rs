//! Balance queries.

use crate::{ApiResult, AppState};
use axum::extract::State;
use axum::Json;
use opb_chain::{Address, Hash};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /balances/list` response.
#[derive(Serialize)]
pub struct BalancesResponse {
    pub block_hash: Hash,
    pub balances: HashMap<Address, u64>,
}

/// GET /balances/list
pub async fn list_balances(State(state): State<AppState>) -> ApiResult<Json<BalancesResponse>> {
    Ok(Json(BalancesResponse {
        block_hash: state.ledger.latest_hash(),
        balances: state.ledger.balances(),
    }))
}
