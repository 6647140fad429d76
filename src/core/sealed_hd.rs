//! Sealed-HD custody: a 24-word mnemonic per wallet family, envelope-sealed
//! at rest, with BIP44 children reserved through an atomic index counter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use coins_bip32::xkeys::XPriv;
use coins_bip39::{English, Mnemonic};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use tracing::info;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::core::domain::{Chain, CustodyKind, DerivedWalletKey, SignatureResult, WalletRecord};
use crate::core::errors::WalletError;
use crate::core::key_manager::{signature_result, HdKeyManager, KeyManager};
use crate::crypto::address;
use crate::crypto::envelope::EnvelopeCipher;
use crate::crypto::recovery;
use crate::storage::{HdIndexStore, SealedSecretRepository, WalletRepository};

const MNEMONIC_WORDS: usize = 24; // 256-bit entropy

/// BIP44 path for a chain's external receive index:
/// m/44'/{coin}'/0'/0/{index}.
pub fn bip44_path(chain: Chain, index: u32) -> String {
    format!("m/44'/{}'/0'/0/{}", chain.coin_type(), index)
}

/// Re-derive one child key from a mnemonic phrase.
pub fn derive_child_key(
    phrase: &str,
    chain: Chain,
    index: u32,
) -> Result<DerivedWalletKey, WalletError> {
    let path = bip44_path(chain, index);
    let mnemonic = Mnemonic::<English>::new_from_phrase(phrase)
        .map_err(|e| WalletError::MnemonicError(e.to_string()))?;
    let xpriv: XPriv = mnemonic
        .derive_key(path.as_str(), None)
        .map_err(|e| WalletError::KeyDerivationError(e.to_string()))?;
    let signing_key: &SigningKey = xpriv.as_ref();

    let encoded = signing_key.verifying_key().to_encoded_point(false);
    let mut public_key_uncompressed = [0u8; 65];
    public_key_uncompressed.copy_from_slice(encoded.as_bytes());

    let wallet_address = address::derive_address(chain, &public_key_uncompressed)?;
    let private_key = Zeroizing::new(signing_key.to_bytes().into());

    Ok(DerivedWalletKey {
        private_key,
        public_key_uncompressed,
        address: wallet_address,
        path,
    })
}

pub struct SealedHdKeyManager {
    envelope: EnvelopeCipher,
    secrets: Arc<dyn SealedSecretRepository>,
    wallets: Arc<dyn WalletRepository>,
    indices: Arc<dyn HdIndexStore>,
}

impl SealedHdKeyManager {
    pub fn new(
        envelope: EnvelopeCipher,
        secrets: Arc<dyn SealedSecretRepository>,
        wallets: Arc<dyn WalletRepository>,
        indices: Arc<dyn HdIndexStore>,
    ) -> Self {
        Self {
            envelope,
            secrets,
            wallets,
            indices,
        }
    }

    async fn unseal_phrase(&self, secret_id: &str) -> Result<Zeroizing<String>, WalletError> {
        let sealed = self
            .secrets
            .find(secret_id)
            .await?
            .ok_or_else(|| WalletError::NotFoundError(format!("sealed secret {}", secret_id)))?;
        self.envelope.unseal(&sealed).await
    }

    fn build_record(
        &self,
        owner_id: &str,
        chain: Chain,
        asset_code: &str,
        secret_id: &str,
        index: u32,
        key: &DerivedWalletKey,
    ) -> WalletRecord {
        WalletRecord {
            wallet_id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            chain,
            asset_code: asset_code.to_string(),
            address: key.address.clone(),
            custody: CustodyKind::SealedHd,
            kms_key_id: None,
            secret_id: Some(secret_id.to_string()),
            derivation_index: Some(index),
            derivation_path: Some(key.path.clone()),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl KeyManager for SealedHdKeyManager {
    async fn create_wallet(
        &self,
        owner_id: &str,
        chain: Chain,
        asset_code: &str,
    ) -> Result<WalletRecord, WalletError> {
        let mnemonic = Mnemonic::<English>::new_with_count(&mut OsRng, MNEMONIC_WORDS)
            .map_err(|e| WalletError::MnemonicError(e.to_string()))?;
        let phrase = Zeroizing::new(mnemonic.to_phrase());

        let sealed = self.envelope.seal(owner_id, &phrase).await?;
        let secret_id = sealed.secret_id.clone();
        self.secrets.save(sealed).await?;

        let index = self.indices.reserve_next_index(&secret_id).await?;
        let key = derive_child_key(&phrase, chain, index)?;
        let record = self.build_record(owner_id, chain, asset_code, &secret_id, index, &key);
        self.wallets.save(record.clone()).await?;
        info!(
            wallet_id = %record.wallet_id,
            %chain,
            path = %key.path,
            "created sealed-HD wallet"
        );
        Ok(record)
    }

    async fn sign_digest(
        &self,
        wallet: &WalletRecord,
        digest: &[u8; 32],
    ) -> Result<SignatureResult, WalletError> {
        let secret_id = wallet.secret_id.as_deref().ok_or_else(|| {
            WalletError::ValidationError(format!("wallet {} has no sealed secret", wallet.wallet_id))
        })?;
        let index = wallet.derivation_index.ok_or_else(|| {
            WalletError::ValidationError(format!(
                "wallet {} has no derivation index",
                wallet.wallet_id
            ))
        })?;

        let phrase = self.unseal_phrase(secret_id).await?;
        let key = derive_child_key(&phrase, wallet.chain, index)?;
        let signing_key = SigningKey::from_slice(&key.private_key[..])
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        let signature: Signature = signing_key
            .sign_prehash(digest)
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        let signature = signature.normalize_s().unwrap_or(signature);

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        let recovery_id =
            recovery::resolve_recovery_id(digest, &r, &s, &key.public_key_uncompressed)?;
        Ok(signature_result(r, s, Some(recovery_id), wallet.chain))
    }

    fn as_hd(&self) -> Option<&dyn HdKeyManager> {
        Some(self)
    }
}

#[async_trait]
impl HdKeyManager for SealedHdKeyManager {
    async fn derive_address(&self, wallet: &WalletRecord) -> Result<WalletRecord, WalletError> {
        let secret_id = wallet.secret_id.as_deref().ok_or_else(|| {
            WalletError::ValidationError(format!("wallet {} has no sealed secret", wallet.wallet_id))
        })?;

        let phrase = self.unseal_phrase(secret_id).await?;
        let index = self.indices.reserve_next_index(secret_id).await?;
        let key = derive_child_key(&phrase, wallet.chain, index)?;
        let record = self.build_record(
            &wallet.owner_id,
            wallet.chain,
            &wallet.asset_code,
            secret_id,
            index,
            &key,
        );
        self.wallets.save(record.clone()).await?;
        info!(
            wallet_id = %record.wallet_id,
            parent = %wallet.wallet_id,
            path = %key.path,
            "derived HD address"
        );
        Ok(record)
    }
}
