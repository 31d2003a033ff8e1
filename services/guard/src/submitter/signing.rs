//! Builds and signs the raw transaction bytes [`crate::submitter::TxSubmitter`]
//! broadcasts, from a contract call's encoded calldata and the
//! [`Transactor`] context the submitter allocated.
//!
//! Signing is synchronous: [`PrivateKeySigner`] never needs network access to
//! produce a signature, so `submit_transaction` and `bump_attempt` call this
//! directly inline without blocking the async runtime.

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::primitives::{Address, Bytes, TxKind};
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;

use crate::error::{AppError, InfraError, Result};
use crate::submitter::Transactor;

/// Signs a contract call against `to` with `calldata`, using EIP-1559 or
/// legacy pricing depending on `supports_eip1559`, and returns the raw
/// RLP-encoded bytes [`rpc_backend::ChainProvider::send_raw_transaction`]
/// expects.
///
/// # Errors
/// Returns [`InfraError::Signer`] if signing fails.
pub fn build_and_sign(
    signer: &PrivateKeySigner,
    to: Address,
    calldata: Bytes,
    transactor: Transactor,
    supports_eip1559: bool,
) -> Result<Bytes> {
    let envelope = if supports_eip1559 {
        let tx = TxEip1559 {
            chain_id: transactor.chain_id,
            nonce: transactor.nonce,
            gas_limit: transactor.gas_limit,
            max_fee_per_gas: transactor.max_fee_per_gas,
            max_priority_fee_per_gas: transactor.max_priority_fee_per_gas,
            to: TxKind::Call(to),
            value: alloy::primitives::U256::ZERO,
            input: calldata,
            access_list: Default::default(),
        };
        let signature = signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|err| AppError::Infra(InfraError::Signer(err.to_string())))?;
        TxEnvelope::Eip1559(tx.into_signed(signature))
    } else {
        let tx = TxLegacy {
            chain_id: Some(transactor.chain_id),
            nonce: transactor.nonce,
            gas_limit: transactor.gas_limit,
            gas_price: transactor.max_fee_per_gas,
            to: TxKind::Call(to),
            value: alloy::primitives::U256::ZERO,
            input: calldata,
        };
        let signature = signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|err| AppError::Infra(InfraError::Signer(err.to_string())))?;
        TxEnvelope::Legacy(tx.into_signed(signature))
    };

    Ok(Bytes::from(alloy::eips::eip2718::Encodable2718::encoded_2718(&envelope)))
}
