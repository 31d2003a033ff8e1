//! ABI bindings for the Inbox contract shared by the Summit (hub) chain and
//! every spoke chain's `LightInbox`.
//!
//! Both deployments emit the same three report-lifecycle events and expose
//! the same validation/verification/report entry points; only the data they
//! hold (snapshots on the hub, attestations+receipts on the spokes) differs.
//!
//! # Solidity Contract (abridged)
//!
//! ```solidity
//! interface IInbox {
//!     event SnapshotAccepted(uint32 indexed domain, address indexed notary, bytes snapshotPayload, bytes snapshotSignature);
//!     event AttestationAccepted(uint32 indexed domain, address indexed notary, bytes attPayload, bytes attSignature);
//!     event ReceiptAccepted(uint32 indexed domain, address indexed notary, bytes rcptPayload, bytes rcptSignature);
//!
//!     function isValidState(bytes memory statePayload) external view returns (bool);
//!     function isValidAttestation(bytes memory attPayload) external view returns (bool);
//!     function isValidReceipt(bytes memory rcptPayload) external view returns (bool);
//!
//!     function verifyStateWithSnapshot(uint8 stateIndex, bytes memory snapPayload, bytes memory snapSignature) external returns (bool);
//!     function verifyAttestation(bytes memory attPayload, bytes memory attSignature) external returns (bool);
//!     function verifyReceipt(bytes memory rcptPayload, bytes memory rcptSignature) external returns (bool);
//!
//!     function submitStateReportWithSnapshot(uint8 stateIndex, bytes memory snapPayload, bytes memory snapSignature, bytes memory srSignature) external returns (bool);
//!     function submitAttestationReport(bytes memory attPayload, bytes memory arSignature) external returns (bool);
//!     function submitReceiptReport(bytes memory rcptPayload, bytes memory rrSignature) external returns (bool);
//! }
//! ```

use alloy::sol;

sol! {
    /// A notary's snapshot of origin states was accepted into the Inbox.
    #[derive(Debug, PartialEq, Eq)]
    event SnapshotAccepted(
        uint32 indexed domain,
        address indexed notary,
        bytes snapshotPayload,
        bytes snapshotSignature
    );

    /// A notary's attestation of a snapshot was accepted on a destination chain.
    #[derive(Debug, PartialEq, Eq)]
    event AttestationAccepted(
        uint32 indexed domain,
        address indexed notary,
        bytes attPayload,
        bytes attSignature
    );

    /// A notary's receipt of a completed message was accepted.
    #[derive(Debug, PartialEq, Eq)]
    event ReceiptAccepted(
        uint32 indexed domain,
        address indexed notary,
        bytes rcptPayload,
        bytes rcptSignature
    );

    /// Read-only call interface: structural + semantic validation of a
    /// single origin state against what this chain believes is canonical.
    #[derive(Debug, PartialEq, Eq)]
    function isValidState(bytes memory statePayload) external view returns (bool isValid);

    /// Read-only call interface: validation of a full attestation.
    #[derive(Debug, PartialEq, Eq)]
    function isValidAttestation(bytes memory attPayload) external view returns (bool isValid);

    /// Read-only call interface: validation of a message receipt.
    #[derive(Debug, PartialEq, Eq)]
    function isValidReceipt(bytes memory rcptPayload) external view returns (bool isValid);

    /// Flags a single state within an accepted snapshot as fraudulent,
    /// identified by its index in the snapshot.
    #[derive(Debug, PartialEq, Eq)]
    function verifyStateWithSnapshot(
        uint8 stateIndex,
        bytes memory snapPayload,
        bytes memory snapSignature
    ) external returns (bool wasSlashed);

    /// Flags an accepted attestation as invalid.
    #[derive(Debug, PartialEq, Eq)]
    function verifyAttestation(
        bytes memory attPayload,
        bytes memory attSignature
    ) external returns (bool wasSlashed);

    /// Flags an accepted receipt as invalid.
    #[derive(Debug, PartialEq, Eq)]
    function verifyReceipt(
        bytes memory rcptPayload,
        bytes memory rcptSignature
    ) external returns (bool wasSlashed);

    /// Files a state report against the notary that published the snapshot,
    /// countersigned by the guard.
    #[derive(Debug, PartialEq, Eq)]
    function submitStateReportWithSnapshot(
        uint8 stateIndex,
        bytes memory snapPayload,
        bytes memory snapSignature,
        bytes memory srSignature
    ) external returns (bool wasSlashed);

    /// Files an attestation report against the notary that produced it.
    #[derive(Debug, PartialEq, Eq)]
    function submitAttestationReport(
        bytes memory attPayload,
        bytes memory arSignature
    ) external returns (bool wasSlashed);

    /// Files a receipt report against the notary that produced it.
    #[derive(Debug, PartialEq, Eq)]
    function submitReceiptReport(
        bytes memory rcptPayload,
        bytes memory rrSignature
    ) external returns (bool wasSlashed);
}
