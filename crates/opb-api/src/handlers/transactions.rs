//! Transaction submission.

use crate::{ApiError, ApiResult, AppState};
use axum::extract::State;
use axum::Json;
use opb_chain::{Address, Txn, DEFAULT_GAS_PRICE, TXN_GAS};
use serde::{Deserialize, Serialize};

/// `POST /txn/add` request. The server computes the nonce from pending
/// state when the caller leaves it out, fills the gas fields according to
/// the fork, and signs with the submitter's keystore entry.
#[derive(Deserialize)]
pub struct TxnAddRequest {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /txn/add` response. A confirmation rather than a block hash:
/// mining can take minutes, and the txn is gossiped so every node has an
/// equal chance of sealing it.
#[derive(Serialize)]
pub struct TxnAddResponse {
    pub success: bool,
}

/// POST /txn/add
pub async fn add_txn(
    State(state): State<AppState>,
    Json(req): Json<TxnAddRequest>,
) -> ApiResult<Json<TxnAddResponse>> {
    if req.from.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "'from' and 'password' fields are empty".to_string(),
        ));
    }

    let from = Address::from_hex(&req.from)?;
    let to = Address::from_hex(&req.to)?;
    let nonce = req
        .nonce
        .unwrap_or_else(|| state.ledger.pending_next_nonce(&from));

    let txn = if state.ledger.pending_fork_active() {
        Txn::with_gas(from, to, req.value, nonce, TXN_GAS, DEFAULT_GAS_PRICE, req.data)
    } else {
        Txn::new(from, to, req.value, nonce, req.data)
    };

    let signed = opb_wallet::sign_txn(&state.data_dir, txn, &req.password)?;
    state.admit_txn(signed)?;

    Ok(Json(TxnAddResponse { success: true }))
}
