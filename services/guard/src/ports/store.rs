//! Storage port for the guard's own bookkeeping: disputes and the
//! merkle-proofed agent tree/root snapshots, independent of any particular
//! backend.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;

use crate::error::Result;
use crate::types::entities::{AgentRoot, AgentTree, Dispute};
use crate::types::enums::DisputeStatus;

/// Persistence port for dispute and agent-state bookkeeping.
#[async_trait]
pub trait GuardStore: Send + Sync {
    /// Upsert a dispute row, keyed by `(chain_id, dispute_index)`.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_dispute(&self, dispute: &Dispute) -> Result<()>;

    /// Update a dispute's status.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn update_dispute_status(
        &self,
        chain_id: u64,
        dispute_index: u64,
        status: DisputeStatus,
    ) -> Result<()>;

    /// Fetch a dispute's current status, if one is on file for this agent.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn get_open_dispute(&self, chain_id: u64, agent: Address) -> Result<Option<Dispute>>;

    /// Persist a merkle-proofed snapshot of one agent's leaf.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_agent_tree(&self, tree: &AgentTree) -> Result<()>;

    /// The most recently stored agent tree snapshot for `(chain_id, agent)`.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn get_latest_agent_tree(
        &self,
        chain_id: u64,
        agent: Address,
    ) -> Result<Option<AgentTree>>;

    /// Every agent tree snapshot on `chain_id` whose `block_number` is at
    /// or above `min_block_number` — used by the `LightManager` sweep to
    /// find agents whose local view has advanced past what they last
    /// pushed to a spoke chain.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn get_agent_trees_since(
        &self,
        chain_id: u64,
        min_block_number: u64,
    ) -> Result<Vec<AgentTree>>;

    /// Persist a new hub-wide agent root.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_agent_root(&self, root: &AgentRoot) -> Result<()>;

    /// The latest confirmed agent root for a chain, if any.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn get_latest_agent_root(&self, chain_id: u64) -> Result<Option<AgentRoot>>;

    /// The highest block for which this chain's state has been recorded —
    /// the benign-path sweep's "latest confirmed Summit block" comparison
    /// point, reusing the root table's block column since a root update
    /// always accompanies a new confirmed block.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn get_latest_confirmed_block(&self, chain_id: u64) -> Result<Option<u64>> {
        Ok(self
            .get_latest_agent_root(chain_id)
            .await?
            .map(|root| root.block_number))
    }

    /// Records the state payload (opaque bytes) this guard last submitted
    /// to Summit for `origin_domain`, so the benign-path sweep can tell
    /// whether its local view has advanced since.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_last_submitted_state(
        &self,
        origin_domain: u32,
        nonce: u64,
        block_hash: B256,
    ) -> Result<()>;

    /// The `(nonce, block_hash)` this guard last submitted for
    /// `origin_domain`, if any.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn get_last_submitted_state(
        &self,
        origin_domain: u32,
    ) -> Result<Option<(u64, B256)>>;
}
