//! Bridge-protocol enumerations.
//!
//! These enums map directly to constants used by the on-chain messaging bus
//! contracts (Origin/Destination/Summit) and to the indexer's own bookkeeping.
//! Each provides:
//! - Safe conversion from/to numeric values
//! - Database serialization via `sqlx::Type`
//! - JSON serialization via `serde`

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// AGENT STATUS — on-chain bonding status mirrored locally for dispatch decisions
// ═══════════════════════════════════════════════════════════════════════════════

/// On-chain bonding status of a guard/notary/executor agent.
///
/// Written only by the `BondingManager`/`LightManager` contracts and mirrored
/// locally so `GuardPipeline` can decide whether a status transition even
/// matters (only `Active` and `Unstaking` agents are slashable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[repr(i16)]
#[sqlx(type_name = "smallint")]
#[non_exhaustive]
pub enum AgentStatus {
    /// No bonding record observed yet.
    Unknown = 0,
    /// Bonded and eligible to act.
    Active = 1,
    /// Bonded but has requested to unbond; still slashable until the cooldown elapses.
    Unstaking = 2,
    /// Flagged fraudulent by an open dispute; not yet slashed.
    Fraudulent = 3,
    /// Slashed and removed from the active set.
    Slashed = 4,
}

impl AgentStatus {
    /// Human-readable name for display.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Active => "active",
            Self::Unstaking => "unstaking",
            Self::Fraudulent => "fraudulent",
            Self::Slashed => "slashed",
        }
    }

    /// Whether an agent in this status can still be slashed by a dispute.
    #[must_use]
    pub const fn is_slashable(&self) -> bool {
        matches!(self, Self::Active | Self::Unstaking)
    }
}

impl TryFrom<i16> for AgentStatus {
    type Error = InvalidEnumValue;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Active),
            2 => Ok(Self::Unstaking),
            3 => Ok(Self::Fraudulent),
            4 => Ok(Self::Slashed),
            other => Err(InvalidEnumValue::new("AgentStatus", i64::from(other))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPUTE STATUS — lifecycle of a guard-raised dispute against a notary
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle state of a dispute opened against a notary's attestation.
///
/// `None` is never persisted as a row; it is the implicit reading returned
/// for an agent root with no open or resolved dispute on record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[repr(i16)]
#[sqlx(type_name = "smallint")]
pub enum DisputeStatus {
    /// No dispute on record for this agent root.
    None = 0,
    /// Dispute has been opened and is awaiting resolution.
    Opened = 1,
    /// Dispute has been resolved (slashed or dismissed upstream).
    Resolved = 2,
}

impl DisputeStatus {
    /// Human-readable name for display.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Opened => "opened",
            Self::Resolved => "resolved",
        }
    }

    /// Whether this status is a terminal (no further transition expected) state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::None | Self::Resolved)
    }
}

impl TryFrom<i16> for DisputeStatus {
    type Error = InvalidEnumValue;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Opened),
            2 => Ok(Self::Resolved),
            other => Err(InvalidEnumValue::new("DisputeStatus", i64::from(other))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INDEXER STATE KIND — head vs confirmed cursor separation
// ═══════════════════════════════════════════════════════════════════════════════

/// Which cursor table a `LastIndexed` row belongs to.
///
/// `Unconfirmed` tracks the chain head and may be rewritten as new blocks
/// arrive; `Confirmed` only ever advances once a block has cleared the
/// configured confirmation depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[repr(i16)]
#[sqlx(type_name = "smallint")]
pub enum IndexerStateKind {
    /// Tip-of-chain cursor, may move backwards on a short reorg.
    Unconfirmed = 0,
    /// Cursor for blocks past the confirmation depth.
    Confirmed = 1,
}

impl TryFrom<i16> for IndexerStateKind {
    type Error = InvalidEnumValue;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unconfirmed),
            1 => Ok(Self::Confirmed),
            other => Err(InvalidEnumValue::new("IndexerStateKind", i64::from(other))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TX ATTEMPT STATUS — submitter lifecycle
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle of a transaction attempt tracked by the guard's tx submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[repr(i16)]
#[sqlx(type_name = "smallint")]
#[non_exhaustive]
pub enum TxAttemptStatus {
    /// Signed and queued locally, not yet broadcast.
    Pending = 0,
    /// Broadcast to the mempool, outcome unknown.
    Submitted = 1,
    /// Replaced by a higher-gas-price attempt for the same nonce.
    Replaced = 2,
    /// Mined and confirmed successfully.
    Confirmed = 3,
    /// Mined but reverted, or dropped from the mempool without being mined.
    Failed = 4,
}

impl TxAttemptStatus {
    /// Whether this status means the submitter should stop retrying this nonce.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

impl TryFrom<i16> for TxAttemptStatus {
    type Error = InvalidEnumValue;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Submitted),
            2 => Ok(Self::Replaced),
            3 => Ok(Self::Confirmed),
            4 => Ok(Self::Failed),
            other => Err(InvalidEnumValue::new("TxAttemptStatus", i64::from(other))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Error for an out-of-range numeric value decoded into one of these enums.
#[derive(Debug, Clone, Error)]
#[error("invalid {enum_name} value: {value}")]
pub struct InvalidEnumValue {
    enum_name: &'static str,
    value: i64,
}

impl InvalidEnumValue {
    const fn new(enum_name: &'static str, value: i64) -> Self {
        Self { enum_name, value }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn agent_status_roundtrip_and_slashable() {
        for v in 0..=4_i16 {
            let status = AgentStatus::try_from(v).unwrap();
            assert_eq!(status as i16, v);
        }
        assert!(AgentStatus::Active.is_slashable());
        assert!(AgentStatus::Unstaking.is_slashable());
        assert!(!AgentStatus::Slashed.is_slashable());
        assert!(AgentStatus::try_from(99).is_err());
    }

    #[test]
    fn dispute_status_terminal() {
        assert!(DisputeStatus::None.is_terminal());
        assert!(!DisputeStatus::Opened.is_terminal());
        assert!(DisputeStatus::Resolved.is_terminal());
    }

    #[test]
    fn tx_attempt_status_final() {
        assert!(TxAttemptStatus::Confirmed.is_final());
        assert!(TxAttemptStatus::Failed.is_final());
        assert!(!TxAttemptStatus::Pending.is_final());
        assert!(!TxAttemptStatus::Replaced.is_final());
    }

    #[test]
    fn indexer_state_kind_roundtrip() {
        assert_eq!(
            IndexerStateKind::try_from(0_i16).unwrap(),
            IndexerStateKind::Unconfirmed
        );
        assert_eq!(
            IndexerStateKind::try_from(1_i16).unwrap(),
            IndexerStateKind::Confirmed
        );
        assert!(IndexerStateKind::try_from(7_i16).is_err());
    }
}
