//! In-memory repository implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::domain::{SealedSecret, WalletQuery, WalletRecord};
use crate::core::errors::WalletError;
use crate::storage::{HdIndexStore, SealedSecretRepository, WalletRepository};

#[derive(Default)]
pub struct MemoryWalletRepository {
    wallets: Mutex<HashMap<String, WalletRecord>>,
}

impl MemoryWalletRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletRepository for MemoryWalletRepository {
    async fn save(&self, wallet: WalletRecord) -> Result<(), WalletError> {
        self.wallets
            .lock()
            .insert(wallet.wallet_id.clone(), wallet);
        Ok(())
    }

    async fn find(&self, query: &WalletQuery) -> Result<Option<WalletRecord>, WalletError> {
        let wallets = self.wallets.lock();
        let found = match query {
            WalletQuery::ById(wallet_id) => wallets.get(wallet_id).cloned(),
            WalletQuery::ByOwnerAsset {
                owner_id,
                asset_code,
            } => wallets
                .values()
                .find(|w| &w.owner_id == owner_id && &w.asset_code == asset_code)
                .cloned(),
        };
        Ok(found)
    }
}

#[derive(Default)]
pub struct MemorySealedSecretRepository {
    secrets: Mutex<HashMap<String, SealedSecret>>,
}

impl MemorySealedSecretRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SealedSecretRepository for MemorySealedSecretRepository {
    async fn save(&self, secret: SealedSecret) -> Result<(), WalletError> {
        self.secrets
            .lock()
            .insert(secret.secret_id.clone(), secret);
        Ok(())
    }

    async fn find(&self, secret_id: &str) -> Result<Option<SealedSecret>, WalletError> {
        Ok(self.secrets.lock().get(secret_id).cloned())
    }
}

/// Per-secret fetch-and-increment counter. The mutex makes the reservation
/// atomic; a database implementation would use an atomic update instead.
#[derive(Default)]
pub struct MemoryHdIndexStore {
    counters: Mutex<HashMap<String, u32>>,
}

impl MemoryHdIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HdIndexStore for MemoryHdIndexStore {
    async fn reserve_next_index(&self, secret_id: &str) -> Result<u32, WalletError> {
        let mut counters = self.counters.lock();
        let next = counters.entry(secret_id.to_string()).or_insert(0);
        let reserved = *next;
        *next = next
            .checked_add(1)
            .ok_or_else(|| WalletError::StorageError("derivation index exhausted".to_string()))?;
        Ok(reserved)
    }
}
