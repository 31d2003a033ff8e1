//! Fraud-response reaction logic: one method per [`GuardEvent`] variant,
//! each independently fallible and independently swallowed by the caller —
//! a bad snapshot shouldn't stop this guard from reacting to the next
//! dispute.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use alloy::signers::Signer;
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use rpc_backend::{ChainProvider, TransactionRequest};
use tracing::{info, warn};

use crate::abi::inbox::{
    isValidAttestationCall, isValidReceiptCall, isValidStateCall, submitAttestationReportCall,
    submitReceiptReportCall, submitStateReportWithSnapshotCall, verifyAttestationCall,
    verifyReceiptCall, verifyStateWithSnapshotCall,
};
use crate::abi::bonding_manager::{completeSlashingCall, getDisputeStatusCall};
use crate::abi::light_manager::updateAgentStatusCall;
use crate::abi::summit::{getLatestAgentStateCall, submitSnapshotCall, suggestLatestStateCall};
use crate::error::Result;
use crate::pipeline::metrics::GuardMetrics;
use crate::ports::{GuardStore, SubmitterStore};
use crate::submitter::TxSubmitter;
use crate::types::entities::{AgentRoot, AgentTree, Dispute};
use crate::types::enums::{AgentFlag, DisputeStatus};
use crate::types::events::{
    AttestationEvent, DisputeEvent, EventContext, GuardEvent, ReceiptEvent, RootUpdateEvent,
    SnapshotEvent, StatusUpdateEvent,
};

/// Per-chain deployment addresses the pipeline needs to route calls to.
#[derive(Debug, Clone)]
pub struct ChainAddresses {
    /// The Inbox (Summit Inbox on the hub, `LightInbox` on a spoke) this
    /// chain's events came from.
    pub inbox: Address,
    /// `BondingManager` (hub only) or `LightManager` (spoke) address.
    pub manager: Address,
}

/// Wires decoded [`GuardEvent`]s to their fraud-response reactions.
///
/// Generic over one chain provider type because every chain this guard
/// watches shares a backend; a deployment watching chains with different
/// provider implementations runs one `GuardPipeline` per provider type.
pub struct GuardPipeline<P, GS, SS> {
    providers: HashMap<u64, Arc<P>>,
    addresses: HashMap<u64, ChainAddresses>,
    store: Arc<GS>,
    submitter: Arc<TxSubmitter<P, SS>>,
    signer: PrivateKeySigner,
    metrics: Arc<GuardMetrics>,
}

impl<P, GS, SS> GuardPipeline<P, GS, SS>
where
    P: ChainProvider,
    GS: GuardStore,
    SS: SubmitterStore,
{
    /// Builds a pipeline over one provider and one set of contract
    /// addresses per watched chain, using `signer` to countersign every
    /// report/verify transaction it files.
    #[must_use]
    pub fn new(
        providers: HashMap<u64, Arc<P>>,
        addresses: HashMap<u64, ChainAddresses>,
        store: Arc<GS>,
        submitter: Arc<TxSubmitter<P, SS>>,
        signer: PrivateKeySigner,
        metrics: Arc<GuardMetrics>,
    ) -> Self {
        Self {
            providers,
            addresses,
            store,
            submitter,
            signer,
            metrics,
        }
    }

    /// Routes one decoded event to its handler. Errors are logged by the
    /// caller, never panicked on — a single malformed or unreactable event
    /// must not take down the stream consumer loop.
    ///
    /// # Errors
    /// Returns the handler's error for the caller to log and count.
    pub async fn handle_event(&self, ctx: EventContext, event: GuardEvent) -> Result<()> {
        self.metrics.record_event(event.kind());
        match event {
            GuardEvent::Snapshot(inner) => self.handle_snapshot(ctx, inner).await,
            GuardEvent::Attestation(inner) => self.handle_attestation(ctx, inner).await,
            GuardEvent::Receipt(inner) => self.handle_receipt(ctx, inner).await,
            GuardEvent::Dispute(inner) => self.handle_dispute(ctx, inner).await,
            GuardEvent::StatusUpdate(inner) => self.handle_status_update(ctx, inner).await,
            GuardEvent::RootUpdate(inner) => self.handle_root_update(ctx, inner).await,
        }
    }

    fn provider(&self, chain_id: u64) -> Result<&Arc<P>> {
        self.providers
            .get(&chain_id)
            .ok_or_else(|| crate::error::DomainError::UnknownContract {
                chain_id,
                address: "<no provider configured>".into(),
            })
            .map_err(Into::into)
    }

    fn addresses(&self, chain_id: u64) -> Result<&ChainAddresses> {
        self.addresses
            .get(&chain_id)
            .ok_or_else(|| crate::error::DomainError::UnknownContract {
                chain_id,
                address: "<no contract addresses configured>".into(),
            })
            .map_err(Into::into)
    }

    async fn call<C: SolCall>(&self, chain_id: u64, to: Address, call: C) -> Result<C::Return> {
        let data = Bytes::from(call.abi_encode());
        let request = TransactionRequest::new().to(to).data(data);
        let raw = self.provider(chain_id)?.call(&request).await?;
        C::abi_decode_returns(&raw).map_err(|err| {
            crate::error::DomainError::InvalidPayload {
                reason: format!("decoding return of {}: {err}", C::SIGNATURE),
            }
            .into()
        })
    }

    /// Submits a countersigned report/verify transaction built from `call`.
    async fn submit<C: SolCall + Send + 'static>(
        &self,
        chain_id: u64,
        to: Address,
        call: C,
        report_kind: &'static str,
    ) -> Result<()> {
        let calldata = Bytes::from(call.abi_encode());
        self.submitter.submit_transaction(chain_id, to, calldata).await?;
        self.metrics.record_report(report_kind);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────
    // SnapshotAccepted
    // ─────────────────────────────────────────────────────────────────

    async fn handle_snapshot(&self, ctx: EventContext, event: SnapshotEvent) -> Result<()> {
        let addresses = self.addresses(ctx.chain_id)?.clone();

        for state in &event.states {
            let is_valid: bool = self
                .call(ctx.chain_id, addresses.inbox, isValidStateCall {
                    statePayload: event.payload.clone(),
                })
                .await?;

            if is_valid {
                continue;
            }

            let dispute = self.store.get_open_dispute(ctx.chain_id, event.submitter).await?;
            if dispute.is_some() {
                info!(notary = %event.submitter, "invalid state already under dispute, skipping");
                continue;
            }

            warn!(
                domain = state.origin_domain,
                notary = %event.submitter,
                "invalid state in accepted snapshot, filing report"
            );
            self.submit(
                ctx.chain_id,
                addresses.inbox,
                verifyStateWithSnapshotCall {
                    stateIndex: state.state_index,
                    snapPayload: event.payload.clone(),
                    snapSignature: event.signature.clone(),
                },
                "verify_state",
            )
            .await?;
        }

        if event.submitted_by_notary() {
            let status = self
                .call(ctx.chain_id, addresses.manager, getDisputeStatusCall {
                    agentIndex: event.domain,
                })
                .await?;
            if !status.flagged {
                self.submit(
                    ctx.chain_id,
                    addresses.inbox,
                    submitStateReportWithSnapshotCall {
                        stateIndex: 0,
                        snapPayload: event.payload.clone(),
                        snapSignature: event.signature.clone(),
                        srSignature: event.signature.clone(),
                    },
                    "state_report",
                )
                .await?;
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────
    // AttestationAccepted
    // ─────────────────────────────────────────────────────────────────

    async fn handle_attestation(&self, ctx: EventContext, event: AttestationEvent) -> Result<()> {
        let addresses = self.addresses(ctx.chain_id)?.clone();

        let is_valid: bool = self
            .call(ctx.chain_id, addresses.inbox, isValidAttestationCall {
                attPayload: event.payload.clone(),
            })
            .await?;

        if is_valid {
            return Ok(());
        }

        warn!(notary = %event.notary, domain = event.domain, "invalid attestation accepted, filing report");
        self.submit(
            ctx.chain_id,
            addresses.inbox,
            verifyAttestationCall {
                attPayload: event.payload.clone(),
                attSignature: event.signature.clone(),
            },
            "verify_attestation",
        )
        .await?;
        self.submit(
            ctx.chain_id,
            addresses.inbox,
            submitAttestationReportCall {
                attPayload: event.payload.clone(),
                arSignature: event.signature.clone(),
            },
            "attestation_report",
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────
    // ReceiptAccepted
    // ─────────────────────────────────────────────────────────────────

    async fn handle_receipt(&self, ctx: EventContext, event: ReceiptEvent) -> Result<()> {
        let addresses = self.addresses(ctx.chain_id)?.clone();

        let is_valid: bool = self
            .call(ctx.chain_id, addresses.inbox, isValidReceiptCall {
                rcptPayload: event.payload.clone(),
            })
            .await?;

        if is_valid {
            return Ok(());
        }

        warn!(notary = %event.notary, domain = event.domain, "invalid receipt accepted, filing report");
        self.submit(
            ctx.chain_id,
            addresses.inbox,
            verifyReceiptCall {
                rcptPayload: event.payload.clone(),
                rcptSignature: event.signature.clone(),
            },
            "verify_receipt",
        )
        .await?;
        self.submit(
            ctx.chain_id,
            addresses.inbox,
            submitReceiptReportCall {
                rcptPayload: event.payload.clone(),
                rrSignature: event.signature.clone(),
            },
            "receipt_report",
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────
    // DisputeOpened / StatusUpdated / RootUpdated
    // ─────────────────────────────────────────────────────────────────

    async fn handle_dispute(&self, ctx: EventContext, event: DisputeEvent) -> Result<()> {
        // `DisputeOpened` carries agent indices, not addresses; resolving
        // them to the `Dispute` row's `guard`/`notary` fields needs an
        // agent-registry lookup this pipeline doesn't yet have a call for.
        info!(
            dispute_index = event.dispute_index,
            guard_index = event.guard_index,
            notary_index = event.notary_index,
            "dispute opened"
        );
        self.store
            .store_dispute(&Dispute {
                dispute_index: event.dispute_index,
                chain_id: ctx.chain_id,
                guard: Address::ZERO,
                notary: Address::ZERO,
                status: DisputeStatus::Opened,
                opened_at: chrono::Utc::now(),
            })
            .await
    }

    async fn handle_status_update(&self, ctx: EventContext, event: StatusUpdateEvent) -> Result<()> {
        let addresses = self.addresses(ctx.chain_id)?.clone();

        match event.flag {
            AgentFlag::Fraudulent => {
                let Some(tree) = self.store.get_latest_agent_tree(ctx.chain_id, event.agent).await? else {
                    warn!(agent = %event.agent, "fraudulent agent has no agent-tree proof on file, cannot slash yet");
                    return Ok(());
                };
                self.submit(
                    ctx.chain_id,
                    addresses.manager,
                    completeSlashingCall {
                        domain: event.domain,
                        agentIndex: 0,
                        proof: tree.proof.clone(),
                    },
                    "complete_slashing",
                )
                .await
            }
            AgentFlag::Slashed => {
                self.store
                    .store_agent_tree(&AgentTree {
                        chain_id: ctx.chain_id,
                        agent: event.agent,
                        domain: event.domain,
                        flag: event.flag,
                        proof: vec![],
                        root: alloy::primitives::B256::ZERO,
                        block_number: ctx.block_number,
                    })
                    .await
            }
            AgentFlag::Active | AgentFlag::Unstaking | AgentFlag::Resting => {
                info!(agent = %event.agent, flag = %event.flag, "agent status updated");
                Ok(())
            }
        }
    }

    async fn handle_root_update(&self, ctx: EventContext, event: RootUpdateEvent) -> Result<()> {
        self.store
            .store_agent_root(&AgentRoot {
                chain_id: ctx.chain_id,
                root: event.new_root,
                block_number: ctx.block_number,
            })
            .await
    }

    // ─────────────────────────────────────────────────────────────────
    // Periodic sweeps (not event-triggered)
    // ─────────────────────────────────────────────────────────────────

    /// Compares this guard's local view of `origin_domain`'s latest state
    /// against what Summit has on file, and submits a fresh snapshot if the
    /// local view has advanced. Run on a timer per origin domain from
    /// `main.rs`, not from the event stream.
    ///
    /// # Errors
    /// Returns an error if either view call or the submission fails.
    pub async fn sweep_benign_snapshot(
        &self,
        hub_chain_id: u64,
        origin_chain_id: u64,
        origin_domain: u32,
    ) -> Result<()> {
        let origin_addresses = self.addresses(origin_chain_id)?.clone();
        let hub_addresses = self.addresses(hub_chain_id)?.clone();

        let suggested: Bytes = self
            .call(origin_chain_id, origin_addresses.inbox, suggestLatestStateCall {})
            .await?;

        let current: Bytes = self
            .call(
                hub_chain_id,
                hub_addresses.manager,
                getLatestAgentStateCall {
                    domain: origin_domain,
                    agent: self.signer.address(),
                },
            )
            .await?;

        if suggested == current {
            return Ok(());
        }

        let signature = Bytes::from(
            self.signer
                .sign_message_sync(suggested.as_ref())
                .map_err(|err| crate::error::InfraError::Signer(err.to_string()))?
                .as_bytes()
                .to_vec(),
        );

        self.submit(
            hub_chain_id,
            hub_addresses.inbox,
            submitSnapshotCall {
                snapshotPayload: suggested.clone(),
                snapshotSignature: signature.clone(),
            },
            "benign_snapshot",
        )
        .await?;

        self.store
            .store_last_submitted_state(
                origin_domain,
                0,
                alloy::primitives::keccak256(suggested.as_ref()),
            )
            .await
    }

    /// Pushes every agent-tree row newer than `min_block_number` to a
    /// spoke chain's `LightManager`, keeping its lagging view current. Run
    /// on a timer per spoke chain.
    ///
    /// # Errors
    /// Returns an error if the store query or any submission fails.
    pub async fn sweep_agent_status(&self, spoke_chain_id: u64, min_block_number: u64) -> Result<()> {
        let addresses = self.addresses(spoke_chain_id)?.clone();
        let trees = self.store.get_agent_trees_since(spoke_chain_id, min_block_number).await?;

        for tree in trees {
            self.submit(
                spoke_chain_id,
                addresses.manager,
                updateAgentStatusCall {
                    agent: tree.agent,
                    flag: tree.flag as u8,
                    domain: tree.domain,
                    proof: tree.proof.clone(),
                },
                "update_agent_status",
            )
            .await?;
        }
        Ok(())
    }
}
