//! ABI bindings for the origin `Origin` contract's state suggestion call and
//! the hub `Summit` contract's agent-state view and snapshot submission
//! entry point, used by the benign (non-fraud) snapshot-submission sweep.
//!
//! # Solidity Contracts (abridged)
//!
//! ```solidity
//! interface IOrigin {
//!     function suggestLatestState() external view returns (bytes memory statePayload);
//! }
//!
//! interface ISummit {
//!     function getLatestAgentState(uint32 domain, address agent) external view returns (bytes memory statePayload);
//!     function submitSnapshot(bytes memory snapshotPayload, bytes memory snapshotSignature) external returns (bytes memory attPayload, bytes memory attSignature);
//! }
//! ```

use alloy::sol;

sol! {
    /// Read-only call interface: the origin chain's own opinion of its
    /// latest state, used to detect when a guard's local view has advanced
    /// past what it last submitted to Summit.
    #[derive(Debug, PartialEq, Eq)]
    function suggestLatestState() external view returns (bytes memory statePayload);

    /// Read-only call interface: Summit's last-accepted state for one
    /// (domain, agent) pair.
    #[derive(Debug, PartialEq, Eq)]
    function getLatestAgentState(uint32 domain, address agent) external view returns (bytes memory statePayload);

    /// Submits a freshly assembled, guard-signed snapshot of origin states.
    #[derive(Debug, PartialEq, Eq)]
    function submitSnapshot(
        bytes memory snapshotPayload,
        bytes memory snapshotSignature
    ) external returns (bytes memory attPayload, bytes memory attSignature);
}
