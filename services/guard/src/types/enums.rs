//! Small persisted enums, mirroring the contract-level status flags and the
//! submitter's attempt lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a persisted numeric value doesn't map to a known enum variant.
#[derive(Debug, Clone, Error)]
#[error("invalid enum value in storage: {0}")]
pub struct InvalidEnumValue(pub i16);

// ═══════════════════════════════════════════════════════════════════════════════
// AGENT STATUS FLAG (mirrors `BondingManager`/`LightManager`'s on-chain flag)
// ═══════════════════════════════════════════════════════════════════════════════

/// An agent's on-chain status flag, as emitted by `StatusUpdated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum AgentFlag {
    /// Registered, bonded, eligible to notarize or guard.
    Active = 0,
    /// Requested unbonding; still slashable until the cooldown elapses.
    Unstaking = 1,
    /// Bond fully withdrawn; no longer slashable.
    Resting = 2,
    /// Flagged by a dispute but not yet slashed.
    Fraudulent = 3,
    /// Slashing completed; bond forfeited.
    Slashed = 4,
}

impl AgentFlag {
    /// Agents in these states can still be the target of a dispute or slashing.
    #[must_use]
    pub const fn is_slashable(self) -> bool {
        matches!(self, Self::Active | Self::Unstaking)
    }

    /// Decode from the `uint8` the contract emits.
    ///
    /// # Errors
    /// Returns [`InvalidEnumValue`] for any value outside the known flags.
    pub const fn from_u8(value: u8) -> Result<Self, InvalidEnumValue> {
        match value {
            0 => Ok(Self::Active),
            1 => Ok(Self::Unstaking),
            2 => Ok(Self::Resting),
            3 => Ok(Self::Fraudulent),
            4 => Ok(Self::Slashed),
            other => Err(InvalidEnumValue(other as i16)),
        }
    }

    /// Decode from the `i16` storage representation.
    ///
    /// # Errors
    /// Returns [`InvalidEnumValue`] for any value outside the known flags.
    pub const fn from_i16(value: i16) -> Result<Self, InvalidEnumValue> {
        match value {
            0 => Ok(Self::Active),
            1 => Ok(Self::Unstaking),
            2 => Ok(Self::Resting),
            3 => Ok(Self::Fraudulent),
            4 => Ok(Self::Slashed),
            other => Err(InvalidEnumValue(other)),
        }
    }
}

impl fmt::Display for AgentFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Unstaking => "unstaking",
            Self::Resting => "resting",
            Self::Fraudulent => "fraudulent",
            Self::Slashed => "slashed",
        };
        write!(f, "{s}")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPUTE STATUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle of a dispute row, independent of the agent's own status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum DisputeStatus {
    /// Opened, awaiting resolution.
    Opened = 0,
    /// Resolved in favor of the accused agent (no slashing).
    Resolved = 1,
    /// Resolved against the accused agent; slashing completed.
    Slashed = 2,
}

impl DisputeStatus {
    /// Decode from the `i16` storage representation.
    ///
    /// # Errors
    /// Returns [`InvalidEnumValue`] for any value outside the known statuses.
    pub const fn from_i16(value: i16) -> Result<Self, InvalidEnumValue> {
        match value {
            0 => Ok(Self::Opened),
            1 => Ok(Self::Resolved),
            2 => Ok(Self::Slashed),
            other => Err(InvalidEnumValue(other)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TX ATTEMPT STATUS (TxSubmitter state machine)
// ═══════════════════════════════════════════════════════════════════════════════

/// State of one submitted transaction attempt.
///
/// `pending -> submitted -> (confirmed | replaced | failed)`; a gas bump
/// moves the old attempt to `replaced` and inserts a new `submitted` row
/// under the same nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum AttemptStatus {
    /// Allocated a nonce and persisted, not yet broadcast.
    Pending = 0,
    /// Broadcast to the network, awaiting confirmation.
    Submitted = 1,
    /// Observed included in a block.
    Confirmed = 2,
    /// Superseded by a later attempt at the same nonce (bump, or another
    /// attempt at the nonce confirmed first).
    Replaced = 3,
    /// Permanently failed (e.g. reverted, or rejected as invalid).
    Failed = 4,
}

impl AttemptStatus {
    /// Decode from the `i16` storage representation.
    ///
    /// # Errors
    /// Returns [`InvalidEnumValue`] for any value outside the known statuses.
    pub const fn from_i16(value: i16) -> Result<Self, InvalidEnumValue> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Submitted),
            2 => Ok(Self::Confirmed),
            3 => Ok(Self::Replaced),
            4 => Ok(Self::Failed),
            other => Err(InvalidEnumValue(other)),
        }
    }

    /// Whether an attempt in this status still counts as "in flight" for
    /// reconciliation (eligible for confirmation polling or gas bumping).
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_flag_roundtrips_through_u8() {
        for raw in 0u8..=4 {
            let flag = AgentFlag::from_u8(raw).unwrap();
            assert_eq!(flag as u8, raw);
        }
    }

    #[test]
    fn agent_flag_rejects_unknown_value() {
        assert!(AgentFlag::from_u8(99).is_err());
    }

    #[test]
    fn active_and_unstaking_are_slashable() {
        assert!(AgentFlag::Active.is_slashable());
        assert!(AgentFlag::Unstaking.is_slashable());
        assert!(!AgentFlag::Resting.is_slashable());
        assert!(!AgentFlag::Fraudulent.is_slashable());
        assert!(!AgentFlag::Slashed.is_slashable());
    }

    #[test]
    fn attempt_status_open_set() {
        assert!(AttemptStatus::Pending.is_open());
        assert!(AttemptStatus::Submitted.is_open());
        assert!(!AttemptStatus::Confirmed.is_open());
        assert!(!AttemptStatus::Replaced.is_open());
        assert!(!AttemptStatus::Failed.is_open());
    }

    #[test]
    fn dispute_status_roundtrips() {
        for raw in 0i16..=2 {
            let status = DisputeStatus::from_i16(raw).unwrap();
            assert_eq!(status as i16, raw);
        }
        assert!(DisputeStatus::from_i16(9).is_err());
    }
}
