//! Shared test doubles and stack builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use custody_wallet::core::errors::WalletError;
use custody_wallet::core::hd_keys::HdWalletKeyService;
use custody_wallet::core::sealed_hd::SealedHdKeyManager;
use custody_wallet::crypto::envelope::{EnvelopeCipher, EnvelopeProfile};
use custody_wallet::core::domain::WithdrawalAsset;
use custody_wallet::kms::LocalKms;
use custody_wallet::storage::memory::{
    MemoryHdIndexStore, MemorySealedSecretRepository, MemoryWalletRepository,
};
use custody_wallet::withdrawal::adapters::{
    BroadcastResult, ChainWithdrawalAdapter, WithdrawalContext,
};
use custody_wallet::withdrawal::events::{EventPublisher, WithdrawalEvent};
use custody_wallet::withdrawal::ledger::LedgerGateway;

pub const EVENTS_TOPIC: &str = "withdrawal.events";

/// In-memory ledger with the idempotent-reservation contract.
#[derive(Default)]
pub struct MockLedger {
    pub balances: Mutex<HashMap<(String, String), u128>>,
    pub reservations: Mutex<HashMap<String, (String, String, u128)>>,
    pub completed: Mutex<Vec<(String, String)>>,
    pub released: Mutex<Vec<(String, String)>>,
    pub balance_calls: Mutex<u32>,
}

impl MockLedger {
    pub fn with_balance(owner_id: &str, asset_code: &str, amount_minor: u128) -> Self {
        let ledger = Self::default();
        ledger
            .balances
            .lock()
            .insert((owner_id.to_string(), asset_code.to_string()), amount_minor);
        ledger
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn get_available_balance(
        &self,
        owner_id: &str,
        asset_code: &str,
    ) -> Result<u128, WalletError> {
        *self.balance_calls.lock() += 1;
        Ok(*self
            .balances
            .lock()
            .get(&(owner_id.to_string(), asset_code.to_string()))
            .unwrap_or(&0))
    }

    async fn reserve_funds(
        &self,
        withdrawal_id: &str,
        owner_id: &str,
        asset_code: &str,
        amount_minor: u128,
    ) -> Result<(), WalletError> {
        let mut reservations = self.reservations.lock();
        if reservations.contains_key(withdrawal_id) {
            return Ok(()); // replayed delivery
        }
        let mut balances = self.balances.lock();
        let key = (owner_id.to_string(), asset_code.to_string());
        let available = balances.get(&key).copied().unwrap_or(0);
        if available < amount_minor {
            return Err(WalletError::LedgerError("reserve exceeds balance".to_string()));
        }
        balances.insert(key.clone(), available - amount_minor);
        reservations.insert(
            withdrawal_id.to_string(),
            (key.0, key.1, amount_minor),
        );
        Ok(())
    }

    async fn mark_withdrawal_completed(
        &self,
        withdrawal_id: &str,
        tx_id: &str,
    ) -> Result<(), WalletError> {
        self.reservations.lock().remove(withdrawal_id);
        self.completed
            .lock()
            .push((withdrawal_id.to_string(), tx_id.to_string()));
        Ok(())
    }

    async fn release_reservation(&self, withdrawal_id: &str, reason: &str) -> Result<(), WalletError> {
        if let Some((owner_id, asset_code, amount_minor)) =
            self.reservations.lock().remove(withdrawal_id)
        {
            *self
                .balances
                .lock()
                .entry((owner_id, asset_code))
                .or_insert(0) += amount_minor;
            self.released
                .lock()
                .push((withdrawal_id.to_string(), reason.to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPublisher {
    pub events: Mutex<Vec<(String, WithdrawalEvent)>>,
}

#[async_trait]
impl EventPublisher for MockPublisher {
    async fn publish(&self, topic: &str, event: &WithdrawalEvent) -> Result<(), WalletError> {
        self.events.lock().push((topic.to_string(), event.clone()));
        Ok(())
    }
}

/// Adapter double for orchestrator tests: either broadcasts a fixed txid or
/// fails with a broadcast error.
pub struct StubAdapter {
    asset: WithdrawalAsset,
    outcome: Result<String, String>,
    pub executions: Mutex<u32>,
}

impl StubAdapter {
    pub fn broadcasting(asset: WithdrawalAsset, tx_id: &str) -> Self {
        Self {
            asset,
            outcome: Ok(tx_id.to_string()),
            executions: Mutex::new(0),
        }
    }

    pub fn failing(asset: WithdrawalAsset, detail: &str) -> Self {
        Self {
            asset,
            outcome: Err(detail.to_string()),
            executions: Mutex::new(0),
        }
    }
}

#[async_trait]
impl ChainWithdrawalAdapter for StubAdapter {
    fn supports(&self, asset: WithdrawalAsset) -> bool {
        asset == self.asset
    }

    async fn execute(&self, _context: &WithdrawalContext) -> Result<BroadcastResult, WalletError> {
        *self.executions.lock() += 1;
        match &self.outcome {
            Ok(txid) => Ok(BroadcastResult::from_txid(txid.clone())),
            Err(detail) => Err(WalletError::BroadcastError(detail.clone())),
        }
    }
}

/// Fully wired sealed-HD custody stack over the software KMS.
pub struct SealedStack {
    pub kms: Arc<LocalKms>,
    pub envelope: EnvelopeCipher,
    pub secrets: Arc<MemorySealedSecretRepository>,
    pub wallets: Arc<MemoryWalletRepository>,
    pub indices: Arc<MemoryHdIndexStore>,
    pub manager: Arc<SealedHdKeyManager>,
    pub keys: Arc<HdWalletKeyService>,
}

pub fn sealed_stack(profile: EnvelopeProfile) -> SealedStack {
    let kms = Arc::new(LocalKms::new());
    let envelope = EnvelopeCipher::new(kms.clone(), profile, "test");
    let secrets = Arc::new(MemorySealedSecretRepository::new());
    let wallets = Arc::new(MemoryWalletRepository::new());
    let indices = Arc::new(MemoryHdIndexStore::new());
    let manager = Arc::new(SealedHdKeyManager::new(
        envelope.clone(),
        secrets.clone(),
        wallets.clone(),
        indices.clone(),
    ));
    let keys = Arc::new(HdWalletKeyService::new(envelope.clone(), secrets.clone()));
    SealedStack {
        kms,
        envelope,
        secrets,
        wallets,
        indices,
        manager,
        keys,
    }
}
