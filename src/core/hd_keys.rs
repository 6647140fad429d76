//! Shared key service for chain adapters that sign locally.
//!
//! Adapters never touch the sealed secret store directly; they ask this
//! service for the wallet's derived key bundle and drop it as soon as the
//! transaction is signed.

use std::sync::Arc;

use crate::core::domain::{DerivedWalletKey, WalletRecord};
use crate::core::errors::WalletError;
use crate::core::sealed_hd::derive_child_key;
use crate::crypto::envelope::EnvelopeCipher;
use crate::storage::SealedSecretRepository;

pub struct HdWalletKeyService {
    envelope: EnvelopeCipher,
    secrets: Arc<dyn SealedSecretRepository>,
}

impl HdWalletKeyService {
    pub fn new(envelope: EnvelopeCipher, secrets: Arc<dyn SealedSecretRepository>) -> Self {
        Self { envelope, secrets }
    }

    /// Unseal the wallet's mnemonic and re-derive its child key.
    pub async fn derive_wallet_key(
        &self,
        wallet: &WalletRecord,
    ) -> Result<DerivedWalletKey, WalletError> {
        let secret_id = wallet.secret_id.as_deref().ok_or_else(|| {
            WalletError::ValidationError(format!(
                "wallet {} is not HD-backed",
                wallet.wallet_id
            ))
        })?;
        let index = wallet.derivation_index.ok_or_else(|| {
            WalletError::ValidationError(format!(
                "wallet {} has no derivation index",
                wallet.wallet_id
            ))
        })?;
        let sealed = self
            .secrets
            .find(secret_id)
            .await?
            .ok_or_else(|| WalletError::NotFoundError(format!("sealed secret {}", secret_id)))?;
        let phrase = self.envelope.unseal(&sealed).await?;
        derive_child_key(&phrase, wallet.chain, index)
    }
}
