//! ABI bindings for `LightManager`, the spoke-chain mirror of
//! `BondingManager` that keeps a lagging, merkle-proofed view of every
//! agent's status so a spoke chain's own Inbox can reject messages from
//! agents that Summit has already slashed.
//!
//! # Solidity Contract (abridged)
//!
//! ```solidity
//! interface ILightManager {
//!     event DisputeOpened(uint256 indexed disputeIndex, uint32 indexed guardIndex, uint32 indexed notaryIndex);
//!
//!     function updateAgentStatus(address agent, uint8 flag, uint32 domain, bytes32[] memory proof) external;
//! }
//! ```

use alloy::sol;

sol! {
    /// Mirrors `BondingManager::DisputeOpened` on a spoke chain; guards
    /// observe disputes opened locally as well as ones relayed from Summit.
    #[derive(Debug, PartialEq, Eq)]
    event DisputeOpened(
        uint256 indexed disputeIndex,
        uint32 indexed guardIndex,
        uint32 indexed notaryIndex
    );

    /// Pushes a newer agent status onto the spoke chain, proven against the
    /// latest agent root this `LightManager` has synced.
    #[derive(Debug, PartialEq, Eq)]
    function updateAgentStatus(
        address agent,
        uint8 flag,
        uint32 domain,
        bytes32[] memory proof
    ) external;
}

#[cfg(test)]
mod tests {
    use alloy::sol_types::SolEvent;

    use super::*;

    #[test]
    fn dispute_opened_signature_matches_bonding_manager() {
        assert_eq!(
            DisputeOpened::SIGNATURE,
            crate::abi::bonding_manager::DisputeOpened::SIGNATURE
        );
    }
}
