//! The event sum type the pipeline routes on, and the per-event payloads it
//! carries. Each variant keeps the raw payload/signature bytes the
//! contracts emitted alongside whatever the guard decoded from them, since
//! every report call re-submits those bytes verbatim.

use alloy::primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize};

use crate::types::enums::AgentFlag;

/// Where an event was observed: which chain, which block, which log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Chain the log was emitted on.
    pub chain_id: u64,
    /// Block the log was included in.
    pub block_number: u64,
    /// Log index within the block.
    pub log_index: u64,
    /// Transaction that emitted the log.
    pub tx_hash: B256,
    /// Contract address the log came from (the Inbox, `BondingManager`, or
    /// `LightManager` being watched).
    pub contract: Address,
}

/// One origin chain's state as decoded out of a snapshot payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginState {
    /// Index of this state within its parent snapshot.
    pub state_index: u8,
    /// Origin chain domain id.
    pub origin_domain: u32,
    /// Origin-local nonce this state attests to.
    pub nonce: u64,
    /// Origin block the state was suggested at.
    pub block_number: u64,
}

/// A notary's snapshot of origin states, accepted into an Inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEvent {
    /// Domain the snapshot was submitted on (0 for the hub itself).
    pub domain: u32,
    /// Address of the agent (notary or guard) that submitted the snapshot.
    pub submitter: Address,
    /// Decoded per-origin states contained in the snapshot.
    pub states: Vec<OriginState>,
    /// Raw snapshot payload, re-submitted verbatim in report/verify calls.
    pub payload: Bytes,
    /// The submitter's signature over `payload`.
    pub signature: Bytes,
}

impl SnapshotEvent {
    /// Whether `submitter` acted as a notary (as opposed to a guard) when
    /// publishing this snapshot — notaries snapshot on a named domain,
    /// guards never submit domain-scoped snapshots.
    #[must_use]
    pub const fn submitted_by_notary(&self) -> bool {
        self.domain != 0
    }
}

/// An attestation of a snapshot, accepted on a destination `LightInbox`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationEvent {
    /// Destination domain this attestation was accepted on.
    pub domain: u32,
    /// Notary that produced the attestation.
    pub notary: Address,
    /// The snapshot root the attestation covers.
    pub snapshot_root: B256,
    /// States from the underlying snapshot, for origin-consistency checks.
    pub states: Vec<OriginState>,
    /// Raw attestation payload.
    pub payload: Bytes,
    /// The notary's signature over `payload`.
    pub signature: Bytes,
}

/// A message receipt, accepted on the Summit Inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptEvent {
    /// Domain of the destination chain the message was executed on.
    pub domain: u32,
    /// Notary (or executor) that produced the receipt.
    pub notary: Address,
    /// Raw receipt payload.
    pub payload: Bytes,
    /// The notary's signature over `payload`.
    pub signature: Bytes,
}

/// A dispute between a guard and a notary was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeEvent {
    /// Dispute's index in `BondingManager`'s dispute table.
    pub dispute_index: u64,
    /// Index of the accusing guard agent.
    pub guard_index: u32,
    /// Index of the accused notary agent.
    pub notary_index: u32,
}

/// An agent's status flag changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateEvent {
    /// The agent's new status.
    pub flag: AgentFlag,
    /// Domain the agent is registered on.
    pub domain: u32,
    /// The agent's address.
    pub agent: Address,
}

/// The hub-wide agent merkle root changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootUpdateEvent {
    /// Root before this update.
    pub old_root: B256,
    /// Root after this update.
    pub new_root: B256,
}

/// The decoded event sum type the pipeline's router dispatches on.
///
/// Replaces the reflection-based routing of the system this crate's domain
/// is modeled on with an explicit enum and a topic0-keyed dispatch table
/// (see [`crate::pipeline::router`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardEvent {
    /// `SnapshotAccepted` on a Summit Inbox.
    Snapshot(SnapshotEvent),
    /// `AttestationAccepted` on a destination `LightInbox`.
    Attestation(AttestationEvent),
    /// `ReceiptAccepted` on the Summit Inbox.
    Receipt(ReceiptEvent),
    /// `DisputeOpened` on `BondingManager` or a `LightManager`.
    Dispute(DisputeEvent),
    /// `StatusUpdated` on `BondingManager`.
    StatusUpdate(StatusUpdateEvent),
    /// `RootUpdated` on `BondingManager`.
    RootUpdate(RootUpdateEvent),
}

impl GuardEvent {
    /// Short, stable name for metrics labels and log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot_accepted",
            Self::Attestation(_) => "attestation_accepted",
            Self::Receipt(_) => "receipt_accepted",
            Self::Dispute(_) => "dispute_opened",
            Self::StatusUpdate(_) => "status_updated",
            Self::RootUpdate(_) => "root_updated",
        }
    }
}
