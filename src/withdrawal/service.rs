//! Withdrawal orchestrator.
//!
//! Drives one attempt through the internal lifecycle
//! RECEIVED -> ASSET_RESOLVED -> BALANCE_CHECKED -> RESERVED -> BROADCAST;
//! on the wire only the terminal statuses PROCESSED and FAILED exist.
//! Domain rejections come back as [`WithdrawalOutcome`] variants with the
//! matching event already published; `Err` is reserved for collaborator
//! faults, which the broker retries.

use std::sync::Arc;

use tracing::{info, warn};

use crate::core::amounts;
use crate::core::domain::{WalletQuery, WalletRecord, WithdrawalAsset};
use crate::core::errors::WalletError;
use crate::storage::WalletRepository;
use crate::withdrawal::adapters::{ChainWithdrawalAdapter, WithdrawalContext};
use crate::withdrawal::events::{EventPublisher, WithdrawalEvent};
use crate::withdrawal::ledger::LedgerGateway;

#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub withdrawal_id: String,
    pub owner_id: String,
    /// Raw asset code; normalized to uppercase before resolution.
    pub asset_code: String,
    pub destination: String,
    /// Human-unit decimal amount.
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalOutcome {
    Processed { tx_id: String },
    Failed(WithdrawalFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalFailure {
    UnsupportedAsset { asset_code: String },
    InsufficientBalance { balance_available: String },
    BroadcastError { detail: String },
}

impl WithdrawalFailure {
    /// Wire-format failure reason.
    pub fn reason(&self) -> String {
        match self {
            WithdrawalFailure::UnsupportedAsset { .. } => "UNSUPPORTED_ASSET".to_string(),
            WithdrawalFailure::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE".to_string(),
            WithdrawalFailure::BroadcastError { detail } => format!("BROADCAST_ERROR:{}", detail),
        }
    }
}

pub struct WithdrawalService {
    wallets: Arc<dyn WalletRepository>,
    ledger: Arc<dyn LedgerGateway>,
    publisher: Arc<dyn EventPublisher>,
    adapters: Vec<Arc<dyn ChainWithdrawalAdapter>>,
    events_topic: String,
}

impl WithdrawalService {
    pub fn new(
        wallets: Arc<dyn WalletRepository>,
        ledger: Arc<dyn LedgerGateway>,
        publisher: Arc<dyn EventPublisher>,
        adapters: Vec<Arc<dyn ChainWithdrawalAdapter>>,
        events_topic: impl Into<String>,
    ) -> Self {
        Self {
            wallets,
            ledger,
            publisher,
            adapters,
            events_topic: events_topic.into(),
        }
    }

    pub async fn process(
        &self,
        request: WithdrawalRequest,
    ) -> Result<WithdrawalOutcome, WalletError> {
        info!(
            withdrawal_id = %request.withdrawal_id,
            owner_id = %request.owner_id,
            "withdrawal received"
        );

        // Asset and adapter resolution. Both the unknown-token and the
        // no-adapter case terminate before any ledger interaction.
        let code = request.asset_code.trim().to_ascii_uppercase();
        let resolved = WithdrawalAsset::parse(&code)
            .and_then(|asset| {
                self.adapters
                    .iter()
                    .find(|a| a.supports(asset))
                    .map(|adapter| (asset, adapter))
            });
        let (asset, adapter) = match resolved {
            Some(found) => found,
            None => {
                warn!(withdrawal_id = %request.withdrawal_id, asset_code = %code, "unsupported asset");
                return self
                    .fail(
                        &request,
                        &code,
                        WithdrawalFailure::UnsupportedAsset { asset_code: code.clone() },
                        None,
                    )
                    .await;
            }
        };
        let amount_minor = amounts::parse_to_minor_units(&request.amount, asset.decimals())?;

        let wallet = self.resolve_wallet(&request.owner_id, asset).await?;

        let available = self
            .ledger
            .get_available_balance(&request.owner_id, asset.code())
            .await?;
        if available < amount_minor {
            warn!(
                withdrawal_id = %request.withdrawal_id,
                available,
                requested = amount_minor,
                "insufficient balance"
            );
            let formatted = amounts::format_minor_units(available, asset.decimals());
            return self
                .fail(
                    &request,
                    &code,
                    WithdrawalFailure::InsufficientBalance {
                        balance_available: formatted.clone(),
                    },
                    Some(formatted),
                )
                .await;
        }

        self.ledger
            .reserve_funds(&request.withdrawal_id, &request.owner_id, asset.code(), amount_minor)
            .await?;

        let context = WithdrawalContext {
            withdrawal_id: request.withdrawal_id.clone(),
            wallet,
            asset,
            destination: request.destination.clone(),
            amount_minor,
        };
        match adapter.execute(&context).await {
            Ok(result) => {
                self.ledger
                    .mark_withdrawal_completed(&request.withdrawal_id, &result.txid)
                    .await?;
                self.publisher
                    .publish(
                        &self.events_topic,
                        &WithdrawalEvent::processed(
                            &request.withdrawal_id,
                            &request.owner_id,
                            &code,
                            &request.amount,
                            &request.destination,
                            &result.txid,
                        ),
                    )
                    .await?;
                info!(
                    withdrawal_id = %request.withdrawal_id,
                    txid = %result.txid,
                    "withdrawal processed"
                );
                Ok(WithdrawalOutcome::Processed { tx_id: result.txid })
            }
            Err(err) => {
                warn!(
                    withdrawal_id = %request.withdrawal_id,
                    error = %err,
                    "broadcast failed, releasing reservation"
                );
                let detail = err.to_string();
                self.ledger
                    .release_reservation(&request.withdrawal_id, &detail)
                    .await?;
                self.fail(
                    &request,
                    &code,
                    WithdrawalFailure::BroadcastError { detail },
                    Some(amounts::format_minor_units(available, asset.decimals())),
                )
                .await
            }
        }
    }

    async fn resolve_wallet(
        &self,
        owner_id: &str,
        asset: WithdrawalAsset,
    ) -> Result<WalletRecord, WalletError> {
        self.wallets
            .find(&WalletQuery::ByOwnerAsset {
                owner_id: owner_id.to_string(),
                asset_code: asset.code().to_string(),
            })
            .await?
            .ok_or_else(|| {
                WalletError::NotFoundError(format!("no {} wallet for owner {}", asset, owner_id))
            })
    }

    async fn fail(
        &self,
        request: &WithdrawalRequest,
        asset_code: &str,
        failure: WithdrawalFailure,
        balance_available: Option<String>,
    ) -> Result<WithdrawalOutcome, WalletError> {
        self.publisher
            .publish(
                &self.events_topic,
                &WithdrawalEvent::failed(
                    &request.withdrawal_id,
                    &request.owner_id,
                    asset_code,
                    &request.amount,
                    &request.destination,
                    failure.reason(),
                    balance_available,
                ),
            )
            .await?;
        Ok(WithdrawalOutcome::Failed(failure))
    }
}
