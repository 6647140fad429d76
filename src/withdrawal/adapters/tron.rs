//! Tron withdrawal adapter.
//!
//! The node builds the raw transaction (native transfer or TRC-20 trigger);
//! we sign its sha256 txid digest with the wallet key and attach the 65-byte
//! r || s || v signature before broadcasting.

use std::sync::Arc;

use async_trait::async_trait;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::core::domain::WithdrawalAsset;
use crate::core::errors::WalletError;
use crate::core::hd_keys::HdWalletKeyService;
use crate::crypto::{address, recovery};
use crate::withdrawal::adapters::{BroadcastResult, ChainWithdrawalAdapter, WithdrawalContext};

const TRC20_TRANSFER_SELECTOR: &str = "transfer(address,uint256)";

/// Tron full-node HTTP surface the adapter depends on.
#[async_trait]
pub trait TronRpc: Send + Sync {
    /// wallet/createtransaction: unsigned native TRX transfer.
    async fn build_transfer(
        &self,
        from: &str,
        to: &str,
        amount_sun: u64,
    ) -> Result<Value, WalletError>;

    /// wallet/triggersmartcontract: unsigned contract call.
    async fn trigger_contract(
        &self,
        owner: &str,
        contract: &str,
        selector: &str,
        parameter_hex: &str,
        fee_limit_sun: u64,
    ) -> Result<Value, WalletError>;

    /// wallet/broadcasttransaction: returns the txid.
    async fn broadcast(&self, signed_tx: &Value) -> Result<String, WalletError>;
}

pub struct TronWithdrawalAdapter {
    rpc: Arc<dyn TronRpc>,
    keys: Arc<HdWalletKeyService>,
    usdt_contract: String,
    fee_limit_sun: u64,
}

impl TronWithdrawalAdapter {
    pub fn new(
        rpc: Arc<dyn TronRpc>,
        keys: Arc<HdWalletKeyService>,
        usdt_contract: impl Into<String>,
        fee_limit_sun: u64,
    ) -> Self {
        Self {
            rpc,
            keys,
            usdt_contract: usdt_contract.into(),
            fee_limit_sun,
        }
    }
}

/// ABI parameter block for transfer(address,uint256): two 32-byte words.
fn trc20_transfer_parameter(to_evm: &[u8; 20], amount_sun: u64) -> String {
    let mut parameter = Vec::with_capacity(64);
    parameter.extend_from_slice(&[0u8; 12]);
    parameter.extend_from_slice(to_evm);
    parameter.extend_from_slice(&[0u8; 24]);
    parameter.extend_from_slice(&amount_sun.to_be_bytes());
    hex::encode(parameter)
}

/// Extract and cross-check the txid digest of an unsigned transaction.
fn txid_digest(tx: &Value) -> Result<[u8; 32], WalletError> {
    let txid_hex = tx
        .get("txID")
        .and_then(Value::as_str)
        .ok_or_else(|| WalletError::ValidationError("transaction has no txID".to_string()))?;
    let txid_bytes = hex::decode(txid_hex)
        .map_err(|e| WalletError::ValidationError(format!("txID hex: {}", e)))?;
    let digest: [u8; 32] = txid_bytes
        .try_into()
        .map_err(|_| WalletError::ValidationError("txID is not 32 bytes".to_string()))?;

    // The txid must be the sha256 of raw_data; signing anything else would
    // authorize a transaction we never saw.
    if let Some(raw_hex) = tx.get("raw_data_hex").and_then(Value::as_str) {
        let raw = hex::decode(raw_hex)
            .map_err(|e| WalletError::ValidationError(format!("raw_data_hex: {}", e)))?;
        let computed = Sha256::digest(&raw);
        if computed[..] != digest {
            return Err(WalletError::ValidationError(
                "txID does not match sha256(raw_data)".to_string(),
            ));
        }
    }
    Ok(digest)
}

#[async_trait]
impl ChainWithdrawalAdapter for TronWithdrawalAdapter {
    fn supports(&self, asset: WithdrawalAsset) -> bool {
        matches!(asset, WithdrawalAsset::Trx | WithdrawalAsset::UsdtTrc20)
    }

    async fn execute(&self, context: &WithdrawalContext) -> Result<BroadcastResult, WalletError> {
        let amount_sun = u64::try_from(context.amount_minor).map_err(|_| {
            WalletError::InvalidAmount("amount exceeds the sun transfer bound".to_string())
        })?;

        let unsigned_tx = match context.asset {
            WithdrawalAsset::Trx => {
                self.rpc
                    .build_transfer(&context.wallet.address, &context.destination, amount_sun)
                    .await?
            }
            WithdrawalAsset::UsdtTrc20 => {
                let to_evm = address::tron_address_to_evm_bytes(&context.destination)?;
                let parameter = trc20_transfer_parameter(&to_evm, amount_sun);
                self.rpc
                    .trigger_contract(
                        &context.wallet.address,
                        &self.usdt_contract,
                        TRC20_TRANSFER_SELECTOR,
                        &parameter,
                        self.fee_limit_sun,
                    )
                    .await?
            }
            other => {
                return Err(WalletError::UnsupportedAsset(other.to_string()));
            }
        };

        let digest = txid_digest(&unsigned_tx)?;
        let key = self.keys.derive_wallet_key(&context.wallet).await?;
        let signing_key = SigningKey::from_slice(&key.private_key[..])
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        let signature: Signature = signing_key
            .sign_prehash(&digest)
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        let signature = signature.normalize_s().unwrap_or(signature);

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        let recovery_id =
            recovery::resolve_recovery_id(&digest, &r, &s, &key.public_key_uncompressed)?;

        let mut sig_bytes = [0u8; 65];
        sig_bytes[..64].copy_from_slice(&bytes);
        sig_bytes[64] = recovery_id;

        let mut signed_tx = unsigned_tx;
        signed_tx["signature"] = serde_json::json!([hex::encode(sig_bytes)]);

        let txid = self.rpc.broadcast(&signed_tx).await?;
        info!(
            withdrawal_id = %context.withdrawal_id,
            %txid,
            asset = %context.asset,
            "broadcast TRX transaction"
        );
        Ok(BroadcastResult::from_txid(txid))
    }
}
