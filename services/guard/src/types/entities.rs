//! Persisted domain entities: disputes, agent tree/root snapshots, and
//! transaction attempts.

use alloy::primitives::{Address, Bytes, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::enums::{AgentFlag, AttemptStatus, DisputeStatus};

/// A dispute between a guard and a notary, as tracked by `BondingManager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Dispute's index in `BondingManager`'s dispute table.
    pub dispute_index: u64,
    /// Chain the dispute was observed on.
    pub chain_id: u64,
    /// The accusing guard's address.
    pub guard: Address,
    /// The accused notary's address.
    pub notary: Address,
    /// Current lifecycle status.
    pub status: DisputeStatus,
    /// When this row was first written.
    pub opened_at: DateTime<Utc>,
}

/// A snapshot of one agent's merkle leaf at a given hub block, kept so a
/// later `CompleteSlashing` or `UpdateAgentStatus` call can supply a proof
/// without re-querying the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTree {
    /// Chain this tree snapshot was taken against (the hub, or a spoke
    /// mirroring it via `LightManager`).
    pub chain_id: u64,
    /// The agent this leaf belongs to.
    pub agent: Address,
    /// Domain the agent is registered on.
    pub domain: u32,
    /// The agent's status at the time this leaf was captured.
    pub flag: AgentFlag,
    /// Merkle proof from this leaf up to the root in [`AgentTree::root`].
    pub proof: Vec<B256>,
    /// Root this proof resolves against.
    pub root: B256,
    /// Hub block number this snapshot was taken at.
    pub block_number: u64,
}

/// One hub-wide agent root observed on `BondingManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRoot {
    /// Chain the root was observed on.
    pub chain_id: u64,
    /// The root value.
    pub root: B256,
    /// Block the `RootUpdated` event was emitted in.
    pub block_number: u64,
}

/// One submitted (or about-to-be-submitted) transaction attempt.
///
/// Attempts are immutable once persisted; a gas bump or replacement inserts
/// a new row under the same `(signer, chain_id, nonce)` rather than
/// mutating this one. `to`/`calldata` are carried on the row itself (not
/// just the in-memory `build` closure that first produced them) so a gas
/// bump can re-sign and rebroadcast the same call without the caller
/// re-supplying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxAttempt {
    /// Unique id for this specific attempt (not the nonce).
    pub attempt_id: uuid::Uuid,
    /// Address that signed and broadcast this attempt.
    pub signer: Address,
    /// Chain this attempt was broadcast on.
    pub chain_id: u64,
    /// Nonce this attempt consumes.
    pub nonce: u64,
    /// Current lifecycle status.
    pub status: AttemptStatus,
    /// Transaction hash once broadcast.
    pub tx_hash: Option<B256>,
    /// `maxFeePerGas` (EIP-1559) or `gasPrice` (legacy), in wei.
    pub max_fee_per_gas: u128,
    /// `maxPriorityFeePerGas`, in wei; `0` for legacy transactions.
    pub max_priority_fee_per_gas: u128,
    /// Contract address this attempt calls.
    pub to: Address,
    /// Encoded calldata this attempt carries.
    pub calldata: Bytes,
    /// When this attempt was first persisted.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_attempt_open_status_matches_is_open() {
        let attempt = TxAttempt {
            attempt_id: uuid::Uuid::nil(),
            signer: Address::ZERO,
            chain_id: 1,
            nonce: 0,
            status: AttemptStatus::Submitted,
            tx_hash: None,
            max_fee_per_gas: 1_000_000_000,
            max_priority_fee_per_gas: 1_000_000,
            to: Address::ZERO,
            calldata: Bytes::new(),
            created_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
        };
        assert!(attempt.status.is_open());
    }
}
