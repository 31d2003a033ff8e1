//! Ports the pipeline and submitter depend on, independent of any adapter.

pub mod store;
pub mod submitter_store;

pub use store::GuardStore;
pub use submitter_store::SubmitterStore;
