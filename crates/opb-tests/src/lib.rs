//! # opb-tests
//!
//! Integration tests for the OPB node, covering the end-to-end scenarios
//! the single-crate unit tests cannot: mining over the mempool, pre-emption
//! by synced blocks, fork-transition accounting, replay defense, and
//! restart determinism.

pub mod harness;

#[cfg(test)]
mod mining_tests;



pub use harness::*;
