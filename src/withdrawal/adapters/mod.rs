//! Chain withdrawal adapters.
//!
//! One adapter per chain family; the orchestrator picks the first adapter
//! whose `supports` accepts the asset.

pub mod bitcoin;
pub mod ethereum;
pub mod tron;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::domain::{WalletRecord, WithdrawalAsset};
use crate::core::errors::WalletError;

/// Everything an adapter needs for one broadcast.
#[derive(Clone)]
pub struct WithdrawalContext {
    pub withdrawal_id: String,
    pub wallet: WalletRecord,
    pub asset: WithdrawalAsset,
    pub destination: String,
    pub amount_minor: u128,
}

/// Terminal artifact of a successful broadcast. Adapters that have the raw
/// transaction or a fee figure at hand attach them; only `txid` is promised.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResult {
    pub txid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
}

impl BroadcastResult {
    pub fn from_txid(txid: impl Into<String>) -> Self {
        Self {
            txid: txid.into(),
            raw_transaction: None,
            fee: None,
        }
    }
}

#[async_trait]
pub trait ChainWithdrawalAdapter: Send + Sync {
    fn supports(&self, asset: WithdrawalAsset) -> bool;
    async fn execute(&self, context: &WithdrawalContext) -> Result<BroadcastResult, WalletError>;
}
