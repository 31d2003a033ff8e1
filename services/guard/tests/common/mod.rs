//! Shared integration-test scaffolding.

pub mod containers;
pub mod fixtures;
pub mod mock_submitter_store;
