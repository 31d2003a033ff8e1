//! Domain types: persisted enums, entities, and the event sum type the
//! pipeline dispatches on.

pub mod entities;
pub mod enums;
pub mod events;

pub use entities::{AgentRoot, AgentTree, Dispute, TxAttempt};
pub use enums::{AgentFlag, AttemptStatus, DisputeStatus, InvalidEnumValue};
pub use events::{
    AttestationEvent, DisputeEvent, EventContext, GuardEvent, OriginState, ReceiptEvent,
    RootUpdateEvent, SnapshotEvent, StatusUpdateEvent,
};
