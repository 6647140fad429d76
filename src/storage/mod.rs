//! Persistence collaborator traits.
//!
//! Storage is external to this service; the traits define the narrow
//! surface custody and withdrawal code need. In-memory implementations in
//! [`memory`] back tests and local development.

pub mod memory;

use async_trait::async_trait;

use crate::core::domain::{SealedSecret, WalletQuery, WalletRecord};
use crate::core::errors::WalletError;

#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn save(&self, wallet: WalletRecord) -> Result<(), WalletError>;
    async fn find(&self, query: &WalletQuery) -> Result<Option<WalletRecord>, WalletError>;
}

#[async_trait]
pub trait SealedSecretRepository: Send + Sync {
    async fn save(&self, secret: SealedSecret) -> Result<(), WalletError>;
    async fn find(&self, secret_id: &str) -> Result<Option<SealedSecret>, WalletError>;
}

#[async_trait]
pub trait HdIndexStore: Send + Sync {
    /// Atomically reserve the next derivation index for a sealed secret.
    /// The first reservation returns 0; every reservation returns a value
    /// never handed out before for that secret, with no gaps.
    async fn reserve_next_index(&self, secret_id: &str) -> Result<u32, WalletError>;
}
