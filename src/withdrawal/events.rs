//! Withdrawal result events published to the broker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::WalletError;

/// Terminal wire status of a withdrawal attempt. The orchestrator's
/// intermediate lifecycle states never leave the process; consumers only
/// see one of these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    Processed,
    Failed,
}

/// Outbound event, one per withdrawal attempt. `reason` and
/// `balance_available` accompany failures; `txid` accompanies success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalEvent {
    pub client_id: String,
    pub withdrawal_id: String,
    pub asset: String,
    pub status: WithdrawalStatus,
    /// Human-unit amount exactly as requested.
    pub amount: String,
    pub to_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-unit balance snapshot, present when a balance was read before
    /// the attempt failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_available: Option<String>,
}

impl WithdrawalEvent {
    pub fn processed(
        withdrawal_id: &str,
        client_id: &str,
        asset: &str,
        amount: &str,
        to_address: &str,
        txid: &str,
    ) -> Self {
        Self {
            client_id: client_id.to_string(),
            withdrawal_id: withdrawal_id.to_string(),
            asset: asset.to_string(),
            status: WithdrawalStatus::Processed,
            amount: amount.to_string(),
            to_address: to_address.to_string(),
            txid: Some(txid.to_string()),
            reason: None,
            balance_available: None,
        }
    }

    pub fn failed(
        withdrawal_id: &str,
        client_id: &str,
        asset: &str,
        amount: &str,
        to_address: &str,
        reason: String,
        balance_available: Option<String>,
    ) -> Self {
        Self {
            client_id: client_id.to_string(),
            withdrawal_id: withdrawal_id.to_string(),
            asset: asset.to_string(),
            status: WithdrawalStatus::Failed,
            amount: amount.to_string(),
            to_address: to_address.to_string(),
            txid: None,
            reason: Some(reason),
            balance_available,
        }
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, event: &WithdrawalEvent) -> Result<(), WalletError>;
}
