//! KMS-only custody: one asymmetric secp256k1 key per wallet, private
//! material never leaves the KMS.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::core::domain::{Chain, CustodyKind, SignatureResult, WalletRecord};
use crate::core::errors::WalletError;
use crate::core::key_manager::{signature_result, KeyManager};
use crate::crypto::{address, codec, recovery};
use crate::kms::KmsClient;
use crate::storage::WalletRepository;

pub struct KmsOnlyKeyManager {
    kms: Arc<dyn KmsClient>,
    wallets: Arc<dyn WalletRepository>,
}

impl KmsOnlyKeyManager {
    pub fn new(kms: Arc<dyn KmsClient>, wallets: Arc<dyn WalletRepository>) -> Self {
        Self { kms, wallets }
    }

    async fn public_point(&self, key_id: &str) -> Result<[u8; 65], WalletError> {
        let spki = self.kms.get_public_key_der(key_id).await?;
        codec::spki_to_uncompressed_point(&spki)
    }
}

#[async_trait]
impl KeyManager for KmsOnlyKeyManager {
    async fn create_wallet(
        &self,
        owner_id: &str,
        chain: Chain,
        asset_code: &str,
    ) -> Result<WalletRecord, WalletError> {
        let key_id = self
            .kms
            .create_signing_key(&format!("{}-{}", owner_id, chain))
            .await?;
        let point = self.public_point(&key_id).await?;
        let wallet_address = address::derive_address(chain, &point)?;

        let record = WalletRecord {
            wallet_id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            chain,
            asset_code: asset_code.to_string(),
            address: wallet_address,
            custody: CustodyKind::KmsOnly,
            kms_key_id: Some(key_id),
            secret_id: None,
            derivation_index: None,
            derivation_path: None,
            created_at: Utc::now(),
        };
        self.wallets.save(record.clone()).await?;
        info!(
            wallet_id = %record.wallet_id,
            %chain,
            address = %record.address,
            "created KMS-backed wallet"
        );
        Ok(record)
    }

    async fn sign_digest(
        &self,
        wallet: &WalletRecord,
        digest: &[u8; 32],
    ) -> Result<SignatureResult, WalletError> {
        let key_id = wallet.kms_key_id.as_deref().ok_or_else(|| {
            WalletError::ValidationError(format!(
                "wallet {} has no KMS key",
                wallet.wallet_id
            ))
        })?;

        let der = self.kms.sign_digest(key_id, digest).await?;
        let (r, s) = codec::der_signature_to_rs(&der)?;
        // KMS backends do not promise low-s; canonicalize before recovery.
        let (r, s) = recovery::normalize_signature(r, s)?;

        let point = self.public_point(key_id).await?;
        let recovery_id = recovery::resolve_recovery_id(digest, &r, &s, &point)?;
        Ok(signature_result(r, s, Some(recovery_id), wallet.chain))
    }
}
