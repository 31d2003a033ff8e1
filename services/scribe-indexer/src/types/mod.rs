//! Domain types for the bridge event indexer.
//!
//! - [`enums`] — bridge-protocol enumerations (`AgentStatus`, `DisputeStatus`,
//!   `IndexerStateKind`, `TxAttemptStatus`)
//! - [`primitives`] — validated newtypes (`EthAddress`, `BlockHash`, `TxHash`, `BlockNumber`)
//! - [`entities`] — domain entities for database persistence

pub mod entities;
pub mod enums;
pub mod primitives;

// Re-export commonly used types at module level
pub use entities::{
    AgentRoot, AgentStatusRecord, AgentTree, BlockTime, Dispute, LastIndexed, Log, Receipt,
    Transaction, TxAttempt,
};
pub use enums::{AgentStatus, DisputeStatus, IndexerStateKind, TxAttemptStatus};
pub use primitives::{BlockHash, BlockNumber, EthAddress, TxHash};
