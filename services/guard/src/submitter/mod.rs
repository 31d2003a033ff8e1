//! At-least-once transaction submission: nonce allocation, gas bumping, and
//! confirmation reconciliation for every guard contract write.

pub mod signing;
pub mod tx_submitter;

pub use signing::build_and_sign;
pub use tx_submitter::{SubmitterConfig, Transactor, TxSubmitter, backoff_delay};
