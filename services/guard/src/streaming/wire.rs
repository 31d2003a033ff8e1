//! The JSON log frame this guard receives over the stream, matching the
//! upstream indexer's wire shape field-for-field without taking a crate
//! dependency on it.

use alloy::primitives::{Address, B256, Bytes, LogData};
use alloy::rpc::types::Log as RpcLog;
use serde::Deserialize;

use crate::error::{DomainError, Result};

/// One log frame as the upstream stream serializes it: hex-string
/// addresses/hashes, a plain `u64` block number, and topics as raw 32-byte
/// arrays.
#[derive(Debug, Clone, Deserialize)]
pub struct WireLog {
    chain_id: u64,
    address: String,
    block_number: u64,
    block_hash: String,
    tx_hash: String,
    tx_index: u64,
    log_index: u64,
    topics: Vec<[u8; 32]>,
    data: Vec<u8>,
    removed: bool,
}

impl WireLog {
    /// Chain this log was reported on.
    #[must_use]
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Converts the wire frame into the `alloy` log type the pipeline's
    /// router decodes events from.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidPayload`] if the address or any hash
    /// field isn't valid hex of the expected length.
    pub fn into_rpc_log(self) -> Result<RpcLog> {
        let address: Address = self
            .address
            .parse()
            .map_err(|_| invalid(&format!("bad address {}", self.address)))?;
        let block_hash: B256 = self
            .block_hash
            .parse()
            .map_err(|_| invalid(&format!("bad block hash {}", self.block_hash)))?;
        let tx_hash: B256 = self
            .tx_hash
            .parse()
            .map_err(|_| invalid(&format!("bad tx hash {}", self.tx_hash)))?;
        let topics = self.topics.into_iter().map(B256::from).collect();
        let data = LogData::new_unchecked(topics, Bytes::from(self.data));

        Ok(RpcLog {
            inner: alloy::primitives::Log { address, data },
            block_hash: Some(block_hash),
            block_number: Some(self.block_number),
            block_timestamp: None,
            transaction_hash: Some(tx_hash),
            transaction_index: Some(self.tx_index),
            log_index: Some(self.log_index),
            removed: self.removed,
        })
    }
}

fn invalid(reason: &str) -> crate::error::AppError {
    DomainError::InvalidPayload {
        reason: reason.to_string(),
    }
    .into()
}
