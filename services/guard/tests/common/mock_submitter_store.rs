//! In-memory `SubmitterStore`, used by the nonce-allocation property test so
//! it can run thousands of cases without a database.

use std::sync::Mutex;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use guard::error::Result;
use guard::ports::SubmitterStore;
use guard::types::entities::TxAttempt;
use guard::types::enums::AttemptStatus;
use uuid::Uuid;

#[derive(Default)]
pub struct MockSubmitterStore {
    attempts: Mutex<Vec<TxAttempt>>,
}

impl MockSubmitterStore {
    /// Snapshot of every attempt on file, for test assertions.
    pub fn snapshot(&self) -> Vec<TxAttempt> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubmitterStore for MockSubmitterStore {
    async fn insert_attempt(&self, attempt: &TxAttempt) -> Result<()> {
        self.attempts.lock().unwrap().push(attempt.clone());
        Ok(())
    }

    async fn update_attempt_status(
        &self,
        attempt_id: Uuid,
        status: AttemptStatus,
        tx_hash: Option<B256>,
    ) -> Result<()> {
        let mut attempts = self.attempts.lock().unwrap();
        if let Some(attempt) = attempts.iter_mut().find(|a| a.attempt_id == attempt_id) {
            attempt.status = status;
            if let Some(hash) = tx_hash {
                attempt.tx_hash = Some(hash);
            }
        }
        Ok(())
    }

    async fn get_next_nonce(
        &self,
        signer: Address,
        chain_id: u64,
        chain_reported_nonce: u64,
    ) -> Result<u64> {
        let attempts = self.attempts.lock().unwrap();
        let max_on_file = attempts
            .iter()
            .filter(|a| a.signer == signer && a.chain_id == chain_id)
            .map(|a| a.nonce)
            .max();
        Ok(match max_on_file {
            Some(max) => max + 1,
            None => chain_reported_nonce,
        })
    }

    async fn get_attempts_by_nonce_and_status(
        &self,
        signer: Address,
        chain_id: u64,
        nonce: u64,
        statuses: &[AttemptStatus],
    ) -> Result<Vec<TxAttempt>> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.signer == signer && a.chain_id == chain_id && a.nonce == nonce && statuses.contains(&a.status)
            })
            .cloned()
            .collect())
    }

    async fn get_all_attempts_by_status(
        &self,
        signer: Address,
        chain_id: u64,
        statuses: &[AttemptStatus],
    ) -> Result<Vec<TxAttempt>> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.signer == signer && a.chain_id == chain_id && statuses.contains(&a.status))
            .cloned()
            .collect())
    }

    async fn mark_before_or_at_nonce_replaced_or_confirmed(
        &self,
        signer: Address,
        chain_id: u64,
        nonce: u64,
        confirmed_attempt_id: Uuid,
    ) -> Result<()> {
        let mut attempts = self.attempts.lock().unwrap();
        for attempt in attempts.iter_mut() {
            if attempt.signer != signer || attempt.chain_id != chain_id || attempt.nonce > nonce {
                continue;
            }
            attempt.status = if attempt.attempt_id == confirmed_attempt_id {
                AttemptStatus::Confirmed
            } else if attempt.status.is_open() || attempt.status == AttemptStatus::Confirmed {
                AttemptStatus::Replaced
            } else {
                attempt.status
            };
        }
        Ok(())
    }
}
