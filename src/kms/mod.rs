//! Key management service collaborator.
//!
//! Everything the custody layer needs from a cloud KMS, behind one trait:
//! asymmetric signing keys (KMS-only custody) and data-key material
//! (envelope sealing). A software backend lives in [`local`] for tests and
//! local development.

pub mod local;

pub use local::LocalKms;

use async_trait::async_trait;
use serde::Serialize;
use zeroize::Zeroizing;

use crate::core::errors::WalletError;

/// Context bound to every KMS cryptographic operation and reused as AEAD
/// associated data. Decryption with a different context must fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionContext {
    pub owner_id: String,
    pub env: String,
}

impl EncryptionContext {
    pub fn new(owner_id: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            env: env.into(),
        }
    }

    /// Canonical byte form used as associated data.
    pub fn to_aad(&self) -> Vec<u8> {
        format!("ownerId={};env={}", self.owner_id, self.env).into_bytes()
    }
}

#[async_trait]
pub trait KmsClient: Send + Sync {
    /// Create an asymmetric secp256k1 signing key; returns the key id.
    async fn create_signing_key(&self, label: &str) -> Result<String, WalletError>;

    /// DER-encoded SubjectPublicKeyInfo of an asymmetric key.
    async fn get_public_key_der(&self, key_id: &str) -> Result<Vec<u8>, WalletError>;

    /// Sign a 32-byte digest with an asymmetric key; returns a DER-encoded
    /// ECDSA signature.
    async fn sign_digest(&self, key_id: &str, digest: &[u8; 32]) -> Result<Vec<u8>, WalletError>;

    /// Generate a 256-bit data key bound to `context`; returns the plaintext
    /// key and its wrapped form.
    async fn generate_data_key(
        &self,
        context: &EncryptionContext,
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), WalletError>;

    /// Wrap arbitrary plaintext under the KMS master key, bound to `context`.
    async fn encrypt(
        &self,
        plaintext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, WalletError>;

    /// Unwrap ciphertext produced by [`Self::encrypt`] or
    /// [`Self::generate_data_key`]. Fails if `context` differs from the one
    /// the material was bound to.
    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>, WalletError>;
}
