//! Bitcoin withdrawal adapter.
//!
//! The node funds a PSBT for the transfer; we sign every input with the
//! wallet's derived key, verify our own signatures, and hand the PSBT back
//! to the node for finalization and broadcast.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use bitcoin::psbt::Psbt;
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::SighashCache;
use tracing::{debug, info};

use crate::core::domain::WithdrawalAsset;
use crate::core::errors::WalletError;
use crate::core::hd_keys::HdWalletKeyService;
use crate::withdrawal::adapters::{BroadcastResult, ChainWithdrawalAdapter, WithdrawalContext};

/// walletcreatefundedpsbt response: the funded PSBT and the fee the node
/// selected for it.
#[derive(Debug, Clone)]
pub struct FundedPsbt {
    pub psbt_b64: String,
    pub fee_sat: u64,
}

/// Bitcoin Core RPC surface the adapter depends on.
#[async_trait]
pub trait BitcoinNodeClient: Send + Sync {
    /// walletcreatefundedpsbt: a funded PSBT paying `amount_sat` to
    /// `destination`, spending from `from_address`.
    async fn create_funded_psbt(
        &self,
        from_address: &str,
        destination: &str,
        amount_sat: u64,
    ) -> Result<FundedPsbt, WalletError>;

    /// finalizepsbt: (complete, raw transaction hex).
    async fn finalize_psbt(&self, psbt_b64: &str) -> Result<(bool, String), WalletError>;

    /// sendrawtransaction: returns the txid.
    async fn send_raw_transaction(&self, raw_hex: &str) -> Result<String, WalletError>;
}

pub struct BitcoinWithdrawalAdapter {
    node: Arc<dyn BitcoinNodeClient>,
    keys: Arc<HdWalletKeyService>,
}

impl BitcoinWithdrawalAdapter {
    pub fn new(node: Arc<dyn BitcoinNodeClient>, keys: Arc<HdWalletKeyService>) -> Self {
        Self { node, keys }
    }
}

#[async_trait]
impl ChainWithdrawalAdapter for BitcoinWithdrawalAdapter {
    fn supports(&self, asset: WithdrawalAsset) -> bool {
        matches!(asset, WithdrawalAsset::Btc)
    }

    async fn execute(&self, context: &WithdrawalContext) -> Result<BroadcastResult, WalletError> {
        let amount_sat = u64::try_from(context.amount_minor).map_err(|_| {
            WalletError::InvalidAmount("amount exceeds the satoshi range".to_string())
        })?;

        let funded = self
            .node
            .create_funded_psbt(&context.wallet.address, &context.destination, amount_sat)
            .await?;
        let psbt_bytes = B64
            .decode(&funded.psbt_b64)
            .map_err(|e| WalletError::ValidationError(format!("PSBT base64: {}", e)))?;
        let mut psbt = Psbt::deserialize(&psbt_bytes)
            .map_err(|e| WalletError::ValidationError(format!("PSBT decode: {}", e)))?;

        let key = self.keys.derive_wallet_key(&context.wallet).await?;
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(&key.private_key[..])
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        let public_key = bitcoin::PublicKey::new(secret_key.public_key(&secp));

        // Sighash computation borrows the unsigned transaction while the
        // inputs are being mutated, hence the clone.
        let unsigned_tx = psbt.unsigned_tx.clone();
        let mut cache = SighashCache::new(&unsigned_tx);
        let input_count = psbt.inputs.len();
        for input_index in 0..input_count {
            let (sighash, sighash_type) = psbt
                .sighash_ecdsa(input_index, &mut cache)
                .map_err(|e| WalletError::SigningFailed(format!("input {}: {}", input_index, e)))?;
            let message: Message = sighash;
            let signature = secp.sign_ecdsa(&message, &secret_key);
            secp.verify_ecdsa(&message, &signature, &public_key.inner)
                .map_err(|_| {
                    WalletError::SigningFailed(format!(
                        "input {} signature failed self-verification",
                        input_index
                    ))
                })?;
            psbt.inputs[input_index].partial_sigs.insert(
                public_key,
                bitcoin::ecdsa::Signature {
                    sig: signature,
                    hash_ty: sighash_type,
                },
            );
            debug!(withdrawal_id = %context.withdrawal_id, input_index, "signed PSBT input");
        }

        let signed_b64 = B64.encode(psbt.serialize());
        let (complete, raw_hex) = self.node.finalize_psbt(&signed_b64).await?;
        if !complete {
            return Err(WalletError::BroadcastError(
                "node could not finalize the signed PSBT".to_string(),
            ));
        }

        let txid = self.node.send_raw_transaction(&raw_hex).await?;
        info!(withdrawal_id = %context.withdrawal_id, %txid, inputs = input_count, "broadcast BTC transaction");
        Ok(BroadcastResult {
            txid,
            raw_transaction: Some(raw_hex),
            fee: Some(funded.fee_sat.to_string()),
        })
    }
}
