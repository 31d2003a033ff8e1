//! Table-driven coverage of the enum-decode boundaries and error taxonomy
//! mappings that the unit tests next to each type only sample a handful of.

use guard::error::{AppError, DomainError, InfraError};
use guard::types::enums::{AgentFlag, AttemptStatus, DisputeStatus};
use rstest::rstest;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUM DECODE BOUNDARIES
// ═══════════════════════════════════════════════════════════════════════════════

#[rstest]
#[case::active(0, true)]
#[case::unstaking(1, true)]
#[case::resting(2, true)]
#[case::fraudulent(3, true)]
#[case::slashed(4, true)]
#[case::just_past_last_variant(5, false)]
#[case::far_out_of_range(200, false)]
fn agent_flag_from_u8_boundaries(#[case] raw: u8, #[case] should_decode: bool) {
    assert_eq!(AgentFlag::from_u8(raw).is_ok(), should_decode);
}

#[rstest]
#[case::active(0)]
#[case::unstaking(1)]
#[case::resting(2)]
#[case::fraudulent(3)]
#[case::slashed(4)]
fn agent_flag_from_i16_matches_from_u8(#[case] raw: i16) {
    let from_u8 = AgentFlag::from_u8(u8::try_from(raw).unwrap()).unwrap();
    let from_i16 = AgentFlag::from_i16(raw).unwrap();
    assert_eq!(from_u8, from_i16);
}

#[rstest]
#[case::negative(-1)]
#[case::just_past_last_variant(5)]
#[case::large(i16::MAX)]
fn agent_flag_from_i16_rejects_out_of_range(#[case] raw: i16) {
    assert!(AgentFlag::from_i16(raw).is_err());
}

#[rstest]
#[case::opened(0, true)]
#[case::resolved(1, true)]
#[case::slashed(2, true)]
#[case::just_past_last_variant(3, false)]
#[case::negative(-1, false)]
fn dispute_status_from_i16_boundaries(#[case] raw: i16, #[case] should_decode: bool) {
    assert_eq!(DisputeStatus::from_i16(raw).is_ok(), should_decode);
}

#[rstest]
#[case::pending(0, false)]
#[case::submitted(1, false)]
#[case::confirmed(2, true)]
#[case::replaced(3, true)]
#[case::failed(4, true)]
fn attempt_status_closed_set(#[case] raw: i16, #[case] is_closed: bool) {
    let status = AttemptStatus::from_i16(raw).unwrap();
    assert_eq!(!status.is_open(), is_closed);
}

#[rstest]
#[case::just_past_last_variant(5)]
#[case::negative(-5)]
fn attempt_status_from_i16_rejects_out_of_range(#[case] raw: i16) {
    assert!(AttemptStatus::from_i16(raw).is_err());
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR TAXONOMY: DOMAIN/INFRA ERRORS ALWAYS SURFACE AS THE RIGHT APPERROR ARM
// ═══════════════════════════════════════════════════════════════════════════════

fn sample_domain_error(label: &str) -> DomainError {
    match label {
        "unknown_contract" => DomainError::UnknownContract {
            chain_id: 1,
            address: "0xdead".into(),
        },
        "invalid_payload" => DomainError::InvalidPayload {
            reason: "truncated log data".into(),
        },
        "invalid_enum_value" => DomainError::InvalidEnumValue("9".into()),
        "invalid_flag_transition" => DomainError::InvalidFlagTransition {
            from: "slashed".into(),
            to: "active".into(),
        },
        "reorg_too_deep" => DomainError::ReorgTooDeep {
            chain_id: 1,
            observed_depth: 64,
        },
        "non_monotonic_nonce" => DomainError::NonMonotonicNonce {
            signer: "0xbeef".into(),
            chain_id: 1,
            current_max: 10,
            attempted: 5,
        },
        other => panic!("unknown domain error label: {other}"),
    }
}

#[rstest]
#[case::unknown_contract("unknown_contract")]
#[case::invalid_payload("invalid_payload")]
#[case::invalid_enum_value("invalid_enum_value")]
#[case::invalid_flag_transition("invalid_flag_transition")]
#[case::reorg_too_deep("reorg_too_deep")]
#[case::non_monotonic_nonce("non_monotonic_nonce")]
fn every_domain_error_variant_maps_to_apperror_domain(#[case] label: &str) {
    let domain = sample_domain_error(label);
    let app: AppError = domain.into();
    assert!(matches!(app, AppError::Domain(_)));
}

fn sample_infra_error(label: &str) -> InfraError {
    match label {
        "permanent_rpc" => InfraError::PermanentRpc("invalid v,r,s".into()),
        "signer" => InfraError::Signer("refused to sign".into()),
        "not_found" => InfraError::NotFound,
        "timeout" => InfraError::Timeout("eth_getLogs".into()),
        "retry_exhausted" => InfraError::RetryExhausted {
            attempts: 5,
            reason: "upstream unreachable".into(),
        },
        "internal" => InfraError::Internal("unexpected state".into()),
        other => panic!("unknown infra error label: {other}"),
    }
}

#[rstest]
#[case::permanent_rpc("permanent_rpc")]
#[case::signer("signer")]
#[case::not_found("not_found")]
#[case::timeout("timeout")]
#[case::retry_exhausted("retry_exhausted")]
#[case::internal("internal")]
fn every_infra_error_variant_maps_to_apperror_infra(#[case] label: &str) {
    let infra = sample_infra_error(label);
    let app: AppError = infra.into();
    assert!(matches!(app, AppError::Infra(_)));
}

#[rstest]
#[case::reorg_detected(AppError::ReorgDetected(1))]
#[case::shutdown_requested(AppError::ShutdownRequested)]
fn operational_apperror_variants_are_not_domain_or_infra(#[case] app: AppError) {
    assert!(!matches!(app, AppError::Domain(_) | AppError::Infra(_)));
}
