//! Mining scenarios: single-flight gating, cancellation, pre-emption.

use crate::harness::{solve_block, TestAccount, TestChain};
use opb_chain::Block;
use opb_mining::{mine, MiningError, PendingBlock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[test]
fn empty_mempool_gives_the_miner_nothing_to_do() {
    let chain = TestChain::new(&[], 10);

    // The mining tick is gated on a non-empty pool; and even if it were
    // not, the miner refuses an empty candidate.
    assert!(chain.app.mempool.is_empty());

    let pending = PendingBlock::new(
        chain.app.ledger.latest_hash(),
        chain.app.ledger.next_block_height(),
        TestAccount::generate().address,
        chain.app.mempool.pending_txns(),
    );
    assert!(matches!(
        mine(&CancellationToken::new(), pending),
        Err(MiningError::EmptyBlock)
    ));
}

#[tokio::test]
async fn cancellation_interrupts_a_running_attempt() {
    let gold_rodger = TestAccount::generate();
    let chain = TestChain::new(&[(gold_rodger.address, 1_000_000)], 10);
    chain
        .app
        .admit_txn(gold_rodger.transfer(TestAccount::generate().address, 1, 1, 100))
        .unwrap();

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let pending = PendingBlock::new(
        chain.app.ledger.latest_hash(),
        chain.app.ledger.next_block_height(),
        gold_rodger.address,
        chain.app.mempool.pending_txns(),
    );

    let attempt = tokio::task::spawn_blocking(move || mine(&token, pending));

    // Trip the token while the search may still be running. Either the
    // attempt was cancelled, or it had already found a block; both are
    // terminal within one hash loop.
    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    match attempt.await.unwrap() {
        Ok(block) => assert!(!block.txns.is_empty()),
        Err(MiningError::Cancelled) => {}
        Err(e) => panic!("unexpected mining error: {e}"),
    }
}

#[test]
fn synced_block_preempts_and_the_next_tick_mines_the_rest() {
    let gold_rodger = TestAccount::generate();
    let white_beard = TestAccount::generate();
    let chain = TestChain::new(&[(gold_rodger.address, 1_000_000)], 10);

    // White_beard's node holds two pending txns from gold_rodger.
    let txn1 = gold_rodger.transfer(white_beard.address, 1, 1, 100);
    let txn2 = gold_rodger.transfer(white_beard.address, 2, 2, 101);
    chain.app.admit_txn(txn1.clone()).unwrap();
    chain.app.admit_txn(txn2.clone()).unwrap();

    // Gold_rodger mines a competing block containing only txn1 and it
    // arrives through sync first.
    let peer_block = solve_block(Block::new(
        0,
        opb_chain::Hash::ZERO,
        1_650_000_000,
        0,
        gold_rodger.address,
        vec![txn1.clone()],
    ));
    chain.app.ledger.append_block(peer_block.clone()).unwrap();
    chain.app.mempool.remove_mined(&peer_block);

    // txn1 moved to the archive, txn2 stayed pending.
    assert!(chain.app.mempool.is_archived(&txn1.hash().unwrap()));
    assert!(chain.app.mempool.is_pending(&txn2.hash().unwrap()));

    // The next tick mines txn2 alone on top of the synced block.
    let next = chain.mine_tick(white_beard.address);
    assert_eq!(next.header.height, 1);
    assert_eq!(next.txns, vec![txn2]);
    assert!(chain.app.mempool.is_empty());
}

#[test]
fn stale_attempt_output_is_rejected_after_preemption() {
    let gold_rodger = TestAccount::generate();
    let white_beard = TestAccount::generate();
    let chain = TestChain::new(&[(gold_rodger.address, 1_000_000)], 10);

    let txn1 = gold_rodger.transfer(white_beard.address, 1, 1, 100);
    chain.app.admit_txn(txn1.clone()).unwrap();

    // A local attempt solved over the old tip...
    let stale = solve_block(Block::new(
        0,
        opb_chain::Hash::ZERO,
        1_650_000_000,
        0,
        white_beard.address,
        vec![txn1.clone()],
    ));

    // ...but the peer's block for the same height landed first.
    let peer_block = solve_block(Block::new(
        0,
        opb_chain::Hash::ZERO,
        1_650_000_001,
        0,
        gold_rodger.address,
        vec![txn1],
    ));
    chain.app.ledger.append_block(peer_block).unwrap();

    // First block wins; the stale local solution no longer extends.
    assert!(chain.app.ledger.append_block(stale).is_err());
    assert_eq!(chain.app.ledger.latest_height(), 0);
}
