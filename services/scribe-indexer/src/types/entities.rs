//! Domain entities for database persistence.
//!
//! These mirror the chain-level primitives (`Log`, `Receipt`, `Transaction`,
//! `BlockTime`, `LastIndexed`) plus the guard's own bookkeeping entities
//! (`AgentTree`, `AgentRoot`, `Dispute`, `TxAttempt`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{AgentStatus, DisputeStatus, IndexerStateKind, TxAttemptStatus};
use super::primitives::{BlockHash, BlockNumber, EthAddress, TxHash};

// ═══════════════════════════════════════════════════════════════════════════════
// LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// A single EVM log, keyed by `(chain_id, block_hash, log_index)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Chain this log was emitted on.
    pub chain_id: u64,
    /// Contract address that emitted the log.
    pub address: EthAddress,
    /// Block number containing the log.
    pub block_number: BlockNumber,
    /// Hash of the block containing the log.
    pub block_hash: BlockHash,
    /// Hash of the transaction that emitted the log.
    pub tx_hash: TxHash,
    /// Index of the transaction within the block.
    pub tx_index: u64,
    /// Index of the log within the block.
    pub log_index: u64,
    /// Ordered topic list (0-4 entries, each 32 bytes).
    pub topics: Vec<[u8; 32]>,
    /// Opaque ABI-encoded data.
    pub data: Vec<u8>,
    /// Set when the log was later removed by a reorg notification from the RPC node.
    pub removed: bool,
}

impl Log {
    /// Sort key enforcing the ascending `(tx_index, log_index)` ordering invariant
    /// for logs within the same block.
    #[must_use]
    pub const fn ordering_key(&self) -> (u64, u64) {
        (self.tx_index, self.log_index)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECEIPT
// ═══════════════════════════════════════════════════════════════════════════════

/// A transaction receipt, keyed by `(chain_id, tx_hash)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Chain this receipt belongs to.
    pub chain_id: u64,
    /// Hash of the transaction this receipt describes.
    pub tx_hash: TxHash,
    /// `true` if the transaction succeeded (EIP-658 status byte == 1).
    pub status: bool,
    /// Address of the contract the transaction was sent to (or created).
    pub contract_address: Option<EthAddress>,
    /// Cumulative gas used in the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    /// Gas used by this transaction alone.
    pub gas_used: u64,
    /// Hash of the block containing the transaction.
    pub block_hash: BlockHash,
    /// Block number containing the transaction.
    pub block_number: BlockNumber,
    /// Index of the transaction within the block.
    pub tx_index: u64,
    /// Bloom filter bytes over the receipt's logs.
    pub logs_bloom: Vec<u8>,
    /// The logs emitted by this transaction, in ascending `(tx_index, log_index)` order.
    pub logs: Vec<Log>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// A raw transaction, keyed by `(chain_id, tx_hash)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Chain this transaction belongs to.
    pub chain_id: u64,
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Hash of the block containing the transaction.
    pub block_hash: BlockHash,
    /// Block number containing the transaction.
    pub block_number: BlockNumber,
    /// Index of the transaction within the block.
    pub tx_index: u64,
    /// Raw RLP-encoded transaction bytes.
    pub raw: Vec<u8>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// BLOCK TIME
// ═══════════════════════════════════════════════════════════════════════════════

/// Maps `(chain_id, block_number)` to the block's unix timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTime {
    /// Chain the block belongs to.
    pub chain_id: u64,
    /// Block number.
    pub block_number: BlockNumber,
    /// Block timestamp.
    pub timestamp: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LAST INDEXED (cursor)
// ═══════════════════════════════════════════════════════════════════════════════

/// Cursor row for `(chain_id, contract, kind)`, monotonic non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastIndexed {
    /// Chain the cursor tracks.
    pub chain_id: u64,
    /// Contract address the cursor tracks.
    pub contract: EthAddress,
    /// Whether this is the head (unconfirmed) or confirmed cursor.
    pub kind: IndexerStateKind,
    /// Highest fully-indexed block number for this contract/kind.
    pub block_number: BlockNumber,
}

impl LastIndexed {
    /// Whether `candidate` would be a legal (monotonic) advance over `self`.
    #[must_use]
    pub fn permits_advance_to(&self, candidate: BlockNumber) -> bool {
        candidate >= self.block_number
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AGENT TREE / AGENT ROOT / DISPUTE (guard persistence)
// ═══════════════════════════════════════════════════════════════════════════════

/// A merkle-proof snapshot for one agent at the moment it was last observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTree {
    /// Address of the agent (guard, notary, or executor) this proof is for.
    pub agent: EthAddress,
    /// Agent root the proof was produced against.
    pub agent_root: [u8; 32],
    /// Merkle proof path, root-to-leaf siblings.
    pub proof: Vec<[u8; 32]>,
    /// Block number this snapshot was taken at.
    pub block_number: BlockNumber,
}

/// A historical agent root observed on a given chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRoot {
    /// Chain the root was observed on.
    pub chain_id: u64,
    /// The agent merkle root.
    pub agent_root: [u8; 32],
    /// Block number the root was observed at.
    pub block_number: BlockNumber,
}

/// A dispute opened against a notary's attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// On-chain dispute index.
    pub dispute_index: u64,
    /// Current lifecycle status.
    pub status: DisputeStatus,
    /// Address of the guard that opened the dispute.
    pub guard: EthAddress,
    /// Address of the disputed notary.
    pub notary: EthAddress,
}

impl Dispute {
    /// Whether this dispute is still open (no terminal resolution recorded).
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.status, DisputeStatus::Opened)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TX ATTEMPT (submitter)
// ═══════════════════════════════════════════════════════════════════════════════

/// A single signed-transaction attempt tracked by the tx submitter.
///
/// Keyed by `(signer, chain_id, nonce, attempt_id)`. At most one attempt per
/// `(signer, chain_id, nonce)` may reach `Confirmed`; all others eventually
/// transition to `Replaced`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxAttempt {
    /// Address the transaction is signed by.
    pub signer: EthAddress,
    /// Chain the transaction targets.
    pub chain_id: u64,
    /// Nonce used by this attempt.
    pub nonce: u64,
    /// Monotonically increasing attempt id within this nonce (bump count).
    pub attempt_id: u32,
    /// Fully signed raw transaction bytes.
    pub signed_raw: Vec<u8>,
    /// `maxFeePerGas` for EIP-1559 chains, or `gasPrice` for legacy chains.
    pub max_fee_per_gas: u128,
    /// `maxPriorityFeePerGas`, unused on legacy chains.
    pub max_priority_fee_per_gas: Option<u128>,
    /// Current lifecycle status.
    pub status: TxAttemptStatus,
    /// When this attempt was created.
    pub created_at: DateTime<Utc>,
    /// When this attempt's gas price was last bumped.
    pub last_bumped_at: DateTime<Utc>,
    /// Hash of the block this attempt was confirmed in, once known.
    pub confirmed_block_hash: Option<BlockHash>,
}

impl TxAttempt {
    /// Whether this attempt is still eligible for a gas-price bump.
    #[must_use]
    pub const fn is_bumpable(&self) -> bool {
        matches!(
            self.status,
            TxAttemptStatus::Pending | TxAttemptStatus::Submitted
        )
    }
}

/// Mirrored on-chain bonding status for an agent, refreshed by the guard's
/// periodic status sweep and consulted before issuing slashing reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatusRecord {
    /// The agent this record describes.
    pub agent: EthAddress,
    /// Domain (chain) the agent is registered against; 0 for a guard (all-domain).
    pub domain: u32,
    /// Last observed bonding status.
    pub status: AgentStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> EthAddress {
        EthAddress::new([byte; 20])
    }

    #[test]
    fn log_ordering_key_orders_by_tx_then_log_index() {
        let a = Log {
            chain_id: 1,
            address: addr(1),
            block_number: BlockNumber::new(10),
            block_hash: BlockHash::ZERO,
            tx_hash: TxHash::ZERO,
            tx_index: 2,
            log_index: 0,
            topics: vec![],
            data: vec![],
            removed: false,
        };
        let b = Log {
            tx_index: 2,
            log_index: 1,
            ..a.clone()
        };
        assert!(a.ordering_key() < b.ordering_key());
    }

    #[test]
    fn last_indexed_permits_monotonic_advance_only() {
        let cursor = LastIndexed {
            chain_id: 1,
            contract: addr(1),
            kind: IndexerStateKind::Confirmed,
            block_number: BlockNumber::new(100),
        };
        assert!(cursor.permits_advance_to(BlockNumber::new(101)));
        assert!(cursor.permits_advance_to(BlockNumber::new(100)));
        assert!(!cursor.permits_advance_to(BlockNumber::new(99)));
    }

    #[test]
    fn dispute_is_open_only_while_opened() {
        let dispute = Dispute {
            dispute_index: 1,
            status: DisputeStatus::Opened,
            guard: addr(1),
            notary: addr(2),
        };
        assert!(dispute.is_open());
        let resolved = Dispute {
            status: DisputeStatus::Resolved,
            ..dispute
        };
        assert!(!resolved.is_open());
    }

    #[test]
    fn tx_attempt_bumpable_states() {
        let now = Utc::now();
        let base = TxAttempt {
            signer: addr(1),
            chain_id: 1,
            nonce: 0,
            attempt_id: 0,
            signed_raw: vec![],
            max_fee_per_gas: 1,
            max_priority_fee_per_gas: None,
            status: TxAttemptStatus::Submitted,
            created_at: now,
            last_bumped_at: now,
            confirmed_block_hash: None,
        };
        assert!(base.is_bumpable());
        let confirmed = TxAttempt {
            status: TxAttemptStatus::Confirmed,
            ..base
        };
        assert!(!confirmed.is_bumpable());
    }
}
