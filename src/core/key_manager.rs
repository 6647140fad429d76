//! Custody strategy traits.

use async_trait::async_trait;

use crate::core::domain::{Chain, SignatureResult, WalletRecord};
use crate::core::errors::WalletError;
use crate::crypto::recovery;

/// A custody strategy: creates wallets and signs digests on their behalf.
#[async_trait]
pub trait KeyManager: Send + Sync {
    /// Create and persist a wallet for an owner on a chain.
    async fn create_wallet(
        &self,
        owner_id: &str,
        chain: Chain,
        asset_code: &str,
    ) -> Result<WalletRecord, WalletError>;

    /// Sign a 32-byte digest with the wallet's key.
    async fn sign_digest(
        &self,
        wallet: &WalletRecord,
        digest: &[u8; 32],
    ) -> Result<SignatureResult, WalletError>;

    /// Hierarchical-derivation capability probe. Strategies without it
    /// return None and callers must not offer address derivation.
    fn as_hd(&self) -> Option<&dyn HdKeyManager> {
        None
    }
}

/// Extra surface of custody strategies backed by an HD tree.
#[async_trait]
pub trait HdKeyManager: Send + Sync {
    /// Derive the next address under the wallet's sealed secret, persisting
    /// and returning a new wallet record.
    async fn derive_address(&self, wallet: &WalletRecord) -> Result<WalletRecord, WalletError>;
}

/// Assemble the signature shape chain code consumes from low-s scalars.
pub fn signature_result(
    r: [u8; 32],
    s: [u8; 32],
    recovery_id: Option<u8>,
    chain: Chain,
) -> SignatureResult {
    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&r);
    compact[32..].copy_from_slice(&s);
    SignatureResult {
        r: hex::encode(r),
        s: hex::encode(s),
        v: recovery_id.and_then(|id| recovery::chain_v(chain, id)),
        recovery: recovery_id,
        compact_hex: hex::encode(compact),
    }
}
