//! Withdrawal message intake: decode, normalize, hand to the orchestrator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::errors::WalletError;
use crate::withdrawal::{WithdrawalOutcome, WithdrawalRequest, WithdrawalService};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalMessage {
    pub withdrawal_id: String,
    pub owner_id: String,
    pub asset_code: String,
    pub destination: String,
    pub amount: String,
}

pub struct WithdrawalMessageHandler {
    service: Arc<WithdrawalService>,
}

impl WithdrawalMessageHandler {
    pub fn new(service: Arc<WithdrawalService>) -> Self {
        Self { service }
    }

    /// Decode and handle a raw broker payload.
    pub async fn handle_json(&self, payload: &str) -> Result<WithdrawalOutcome, WalletError> {
        let message: WithdrawalMessage = serde_json::from_str(payload)?;
        self.handle(message).await
    }

    pub async fn handle(&self, message: WithdrawalMessage) -> Result<WithdrawalOutcome, WalletError> {
        info!(
            withdrawal_id = %message.withdrawal_id,
            owner_id = %message.owner_id,
            "withdrawal message"
        );
        let request = WithdrawalRequest {
            withdrawal_id: message.withdrawal_id,
            owner_id: message.owner_id,
            asset_code: message.asset_code.trim().to_ascii_uppercase(),
            destination: message.destination,
            amount: message.amount,
        };
        self.service.process(request).await
    }
}
