//! ABI bindings for the `BondingManager` contract on the Summit (hub) chain.
//!
//! Tracks every agent's (guard's or notary's) bond, status, and dispute
//! state, and is the source of truth for the merkle-proofed agent root that
//! spoke chains sync from.
//!
//! # Solidity Contract (abridged)
//!
//! ```solidity
//! interface IBondingManager {
//!     event DisputeOpened(uint256 indexed disputeIndex, uint32 indexed guardIndex, uint32 indexed notaryIndex);
//!     event StatusUpdated(uint8 flag, uint32 indexed domain, address indexed agent);
//!     event RootUpdated(bytes32 oldRoot, bytes32 newRoot);
//!
//!     function getDisputeStatus(uint32 agentIndex) external view returns (bool flagged, bool slashed, uint256 disputeIndex, address fraudProver);
//!     function completeSlashing(uint32 domain, uint32 agentIndex, bytes32[] memory proof) external;
//!     function resolveDisputeWithProof(uint32 agentIndex, bytes32[] memory proof, bool[] memory flags) external;
//! }
//! ```

use alloy::sol;

sol! {
    /// A dispute between a guard and a notary was opened, either by
    /// `BondingManager` or relayed from a `LightManager` on a spoke chain.
    #[derive(Debug, PartialEq, Eq)]
    event DisputeOpened(
        uint256 indexed disputeIndex,
        uint32 indexed guardIndex,
        uint32 indexed notaryIndex
    );

    /// An agent's status flag changed (e.g. `Active` -> `Fraudulent`).
    #[derive(Debug, PartialEq, Eq)]
    event StatusUpdated(
        uint8 flag,
        uint32 indexed domain,
        address indexed agent
    );

    /// The merkle root over every agent's leaf changed.
    #[derive(Debug, PartialEq, Eq)]
    event RootUpdated(bytes32 oldRoot, bytes32 newRoot);

    /// Read-only call interface for an agent's current dispute, if any.
    #[derive(Debug, PartialEq, Eq)]
    function getDisputeStatus(uint32 agentIndex) external view returns (
        bool flagged,
        bool slashed,
        uint256 disputeIndex,
        address fraudProver
    );

    /// Finalizes the slashing of an already-flagged agent, proving the
    /// agent's current leaf against the last confirmed root.
    #[derive(Debug, PartialEq, Eq)]
    function completeSlashing(
        uint32 domain,
        uint32 agentIndex,
        bytes32[] memory proof
    ) external;
}
