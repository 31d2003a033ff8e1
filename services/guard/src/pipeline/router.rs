//! Decodes a raw chain log into a [`GuardEvent`] via an explicit topic0 ->
//! decoder dispatch table, replacing reflection-based event routing with a
//! plain match.

use alloy::primitives::{B256, Bytes};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;

use crate::abi::{
    AttestationAccepted, BondingManagerDisputeOpened, ReceiptAccepted, RootUpdated,
    SnapshotAccepted, StatusUpdated,
};
use crate::error::{AppError, DomainError, Result};
use crate::types::enums::AgentFlag;
use crate::types::events::{
    AttestationEvent, DisputeEvent, EventContext, GuardEvent, OriginState, ReceiptEvent,
    RootUpdateEvent, SnapshotEvent, StatusUpdateEvent,
};

/// Width, in bytes, of one encoded origin state within a snapshot or
/// attestation payload. The wire format this guard's upstream protocol
/// uses packs `(stateIndex, originDomain, nonce, blockNumber)` into a fixed
/// 32-byte slot per state; this is the minimal shape the pipeline needs to
/// drive the per-state validation fan-out in [`crate::pipeline::handlers`].
const STATE_SLOT_WIDTH: usize = 32;

/// Decode the raw `(indexed topics, data)` of one EVM log into the event
/// sum type the pipeline dispatches on. Returns `Ok(None)` for logs whose
/// topic0 isn't one this router tracks (the caller should skip them).
///
/// # Errors
/// Returns [`DomainError::InvalidPayload`] if a recognized topic0's data
/// fails to decode against its expected ABI shape.
pub fn decode_log(log: &Log) -> Result<Option<(EventContext, GuardEvent)>> {
    let Some(topic0) = log.topics().first().copied() else {
        return Ok(None);
    };

    let context = build_context(log);

    let event = match topic0 {
        t if t == SnapshotAccepted::SIGNATURE_HASH => {
            let decoded = SnapshotAccepted::decode_log_data(&log.inner.data, true)
                .map_err(|err| invalid_payload("SnapshotAccepted", &err))?;
            GuardEvent::Snapshot(SnapshotEvent {
                domain: decoded.domain,
                submitter: decoded.notary,
                states: decode_states(&decoded.snapshotPayload),
                payload: decoded.snapshotPayload.clone(),
                signature: decoded.snapshotSignature.clone(),
            })
        }
        t if t == AttestationAccepted::SIGNATURE_HASH => {
            let decoded = AttestationAccepted::decode_log_data(&log.inner.data, true)
                .map_err(|err| invalid_payload("AttestationAccepted", &err))?;
            GuardEvent::Attestation(AttestationEvent {
                domain: decoded.domain,
                notary: decoded.notary,
                snapshot_root: payload_root(&decoded.attPayload),
                states: decode_states(&decoded.attPayload),
                payload: decoded.attPayload.clone(),
                signature: decoded.attSignature.clone(),
            })
        }
        t if t == ReceiptAccepted::SIGNATURE_HASH => {
            let decoded = ReceiptAccepted::decode_log_data(&log.inner.data, true)
                .map_err(|err| invalid_payload("ReceiptAccepted", &err))?;
            GuardEvent::Receipt(ReceiptEvent {
                domain: decoded.domain,
                notary: decoded.notary,
                payload: decoded.rcptPayload.clone(),
                signature: decoded.rcptSignature.clone(),
            })
        }
        t if t == BondingManagerDisputeOpened::SIGNATURE_HASH => {
            let decoded = BondingManagerDisputeOpened::decode_log_data(&log.inner.data, true)
                .map_err(|err| invalid_payload("DisputeOpened", &err))?;
            GuardEvent::Dispute(DisputeEvent {
                dispute_index: u64::try_from(decoded.disputeIndex).unwrap_or(u64::MAX),
                guard_index: decoded.guardIndex,
                notary_index: decoded.notaryIndex,
            })
        }
        t if t == StatusUpdated::SIGNATURE_HASH => {
            let decoded = StatusUpdated::decode_log_data(&log.inner.data, true)
                .map_err(|err| invalid_payload("StatusUpdated", &err))?;
            let flag = AgentFlag::from_u8(decoded.flag)
                .map_err(|err| AppError::Domain(DomainError::InvalidEnumValue(err.to_string())))?;
            GuardEvent::StatusUpdate(StatusUpdateEvent {
                flag,
                domain: decoded.domain,
                agent: decoded.agent,
            })
        }
        t if t == RootUpdated::SIGNATURE_HASH => {
            let decoded = RootUpdated::decode_log_data(&log.inner.data, true)
                .map_err(|err| invalid_payload("RootUpdated", &err))?;
            GuardEvent::RootUpdate(RootUpdateEvent {
                old_root: decoded.oldRoot,
                new_root: decoded.newRoot,
            })
        }
        _ => return Ok(None),
    };

    Ok(Some((context, event)))
}

fn build_context(log: &Log) -> EventContext {
    EventContext {
        chain_id: 0, // filled in by the caller, which knows which chain's stream this log came from
        block_number: log.block_number.unwrap_or_default(),
        log_index: log.log_index.unwrap_or_default(),
        tx_hash: log.transaction_hash.unwrap_or_default(),
        contract: log.inner.address,
    }
}

fn invalid_payload(event: &str, err: &impl std::fmt::Display) -> AppError {
    AppError::Domain(DomainError::InvalidPayload {
        reason: format!("{event}: {err}"),
    })
}

/// Splits a payload into fixed-width state slots and decodes each one.
/// Any trailing bytes that don't fill a full slot are ignored; malformed
/// upstream payloads are a protocol/semantic error the spec treats as
/// non-recoverable by retry, not a reason to fail the whole snapshot.
fn decode_states(payload: &Bytes) -> Vec<OriginState> {
    payload
        .chunks(STATE_SLOT_WIDTH)
        .enumerate()
        .filter(|(_, chunk)| chunk.len() == STATE_SLOT_WIDTH)
        .map(|(index, chunk)| OriginState {
            state_index: u8::try_from(index).unwrap_or(u8::MAX),
            origin_domain: u32::from_be_bytes(chunk[0..4].try_into().unwrap_or_default()),
            nonce: u64::from_be_bytes(chunk[4..12].try_into().unwrap_or_default()),
            block_number: u64::from_be_bytes(chunk[12..20].try_into().unwrap_or_default()),
        })
        .collect()
}

fn payload_root(payload: &Bytes) -> B256 {
    alloy::primitives::keccak256(payload.as_ref())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, LogData};
    use alloy::sol_types::SolEvent;

    use super::*;

    fn sample_log(topics: Vec<B256>) -> Log {
        let data = LogData::new_unchecked(topics, Bytes::new());
        Log {
            inner: alloy::primitives::Log {
                address: Address::ZERO,
                data,
            },
            block_hash: None,
            block_number: Some(100),
            block_timestamp: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: Some(0),
            removed: false,
        }
    }

    #[test]
    fn unknown_topic0_returns_none() {
        let log = sample_log(vec![B256::repeat_byte(0xAB)]);
        assert!(decode_log(&log).unwrap().is_none());
    }

    #[test]
    fn log_with_no_topics_returns_none() {
        let log = sample_log(vec![]);
        assert!(decode_log(&log).unwrap().is_none());
    }

    #[test]
    fn decode_states_splits_into_fixed_slots() {
        let mut payload = vec![0u8; STATE_SLOT_WIDTH * 2];
        payload[0..4].copy_from_slice(&7u32.to_be_bytes());
        payload[STATE_SLOT_WIDTH..STATE_SLOT_WIDTH + 4].copy_from_slice(&9u32.to_be_bytes());
        let states = decode_states(&Bytes::from(payload));
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].origin_domain, 7);
        assert_eq!(states[1].origin_domain, 9);
        assert_eq!(states[0].state_index, 0);
        assert_eq!(states[1].state_index, 1);
    }

    #[test]
    fn decode_states_ignores_trailing_partial_slot() {
        let payload = vec![0u8; STATE_SLOT_WIDTH + 5];
        let states = decode_states(&Bytes::from(payload));
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn dispute_opened_signature_is_routed() {
        assert_eq!(
            BondingManagerDisputeOpened::SIGNATURE_HASH,
            crate::abi::bonding_manager::DisputeOpened::SIGNATURE_HASH
        );
    }
}
