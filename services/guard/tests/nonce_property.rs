//! Property test for the nonce-allocation invariant that
//! `mark_before_or_at_nonce_replaced_or_confirmed` is meant to enforce: for
//! any `(signer, chain)`, at most one attempt per nonce is ever `confirmed`,
//! and every nonce at or below the highest confirmed one ends up in
//! `{confirmed, replaced}`.
//!
//! Runs against [`MockSubmitterStore`] rather than a real database so
//! proptest can afford to shrink and replay thousands of cases.

mod common;

use alloy::primitives::{Address, Bytes, B256};
use chrono::Utc;
use common::mock_submitter_store::MockSubmitterStore;
use guard::ports::SubmitterStore;
use guard::types::entities::TxAttempt;
use guard::types::enums::AttemptStatus;
use proptest::prelude::*;
use uuid::Uuid;

/// One step of a randomized allocate/bump/confirm sequence against a single
/// `(signer, chain)`.
#[derive(Debug, Clone)]
enum Op {
    /// Allocate a new nonce and submit an attempt under it.
    Allocate,
    /// Bump the most recently allocated open attempt: mark it `Replaced`
    /// and insert a fresh `Submitted` attempt at the same nonce.
    Bump,
    /// Confirm one of the attempts seen so far, by index into the attempts
    /// inserted up to this point.
    Confirm(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Allocate),
        2 => Just(Op::Bump),
        2 => (0usize..16).prop_map(Op::Confirm),
    ]
}

async fn run_ops(ops: &[Op]) -> Vec<TxAttempt> {
    let store = MockSubmitterStore::default();
    let signer = Address::from([0x42; 20]);
    let chain_id = 1;
    let mut inserted_ids = Vec::new();

    for op in ops {
        match op {
            Op::Allocate => {
                let nonce = store.get_next_nonce(signer, chain_id, 0).await.unwrap();
                let attempt = TxAttempt {
                    attempt_id: Uuid::new_v4(),
                    signer,
                    chain_id,
                    nonce,
                    status: AttemptStatus::Submitted,
                    tx_hash: Some(B256::from([0x11; 32])),
                    max_fee_per_gas: 1_000_000_000,
                    max_priority_fee_per_gas: 1_000_000,
                    to: Address::from([0x55; 20]),
                    calldata: Bytes::from_static(&[0xab, 0xcd]),
                    created_at: Utc::now(),
                };
                store.insert_attempt(&attempt).await.unwrap();
                inserted_ids.push(attempt.attempt_id);
            }
            Op::Bump => {
                let Some(&last_id) = inserted_ids.last() else {
                    continue;
                };
                let Some(last) = store.snapshot().into_iter().find(|a| a.attempt_id == last_id) else {
                    continue;
                };
                if !last.status.is_open() {
                    continue;
                }
                store
                    .update_attempt_status(last.attempt_id, AttemptStatus::Replaced, None)
                    .await
                    .unwrap();
                let bumped = TxAttempt {
                    attempt_id: Uuid::new_v4(),
                    status: AttemptStatus::Submitted,
                    ..last
                };
                store.insert_attempt(&bumped).await.unwrap();
                inserted_ids.push(bumped.attempt_id);
            }
            Op::Confirm(idx) => {
                if inserted_ids.is_empty() {
                    continue;
                }
                let id = inserted_ids[idx % inserted_ids.len()];
                let Some(attempt) = store.snapshot().into_iter().find(|a| a.attempt_id == id) else {
                    continue;
                };
                if !attempt.status.is_open() {
                    continue;
                }
                store
                    .update_attempt_status(id, AttemptStatus::Confirmed, None)
                    .await
                    .unwrap();
                store
                    .mark_before_or_at_nonce_replaced_or_confirmed(signer, chain_id, attempt.nonce, id)
                    .await
                    .unwrap();
            }
        }
    }

    store.snapshot()
}

fn assert_nonce_invariant(attempts: &[TxAttempt]) {
    let confirmed_nonces: Vec<u64> = attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Confirmed)
        .map(|a| a.nonce)
        .collect();

    for &nonce in &confirmed_nonces {
        let confirmed_count = attempts
            .iter()
            .filter(|a| a.nonce == nonce && a.status == AttemptStatus::Confirmed)
            .count();
        assert_eq!(confirmed_count, 1, "more than one confirmed attempt at nonce {nonce}");
    }

    if let Some(&max_confirmed) = confirmed_nonces.iter().max() {
        for attempt in attempts.iter().filter(|a| a.nonce <= max_confirmed) {
            assert!(
                matches!(attempt.status, AttemptStatus::Confirmed | AttemptStatus::Replaced),
                "attempt at nonce {} (<= max confirmed {max_confirmed}) is still {:?}",
                attempt.nonce,
                attempt.status,
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn nonce_invariant_holds_after_any_allocate_bump_confirm_sequence(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let attempts = tokio::runtime::Runtime::new().unwrap().block_on(run_ops(&ops));
        assert_nonce_invariant(&attempts);
    }
}
