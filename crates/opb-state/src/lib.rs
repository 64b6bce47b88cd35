//! # opb-state
//!
//! The deterministic state engine of the OPB chain.
//!
//! [`State`] is the pure replay machine: balances and account nonces derived
//! by applying blocks in order, with the OIP-1 fork switch deciding fee
//! accounting. [`Ledger`] wraps two copies of it, the canonical state
//! backed by the block log and a pending working copy that validates
//! incoming transactions before they are mined, and guarantees the
//! canonical state never advances past a block that was not durably
//! written.

mod error;
mod ledger;
mod state;

pub use error::{StateError, StateResult};
pub use ledger::Ledger;
pub use state::State;
