//! Accounting ledger collaborator.

use async_trait::async_trait;

use crate::core::errors::WalletError;

/// Balance and reservation operations on the external ledger.
///
/// `reserve_funds` is idempotent per `withdrawal_id`: broker redelivery may
/// replay a reservation, and replaying must not reserve twice. Exactly one
/// of `mark_withdrawal_completed` or `release_reservation` runs per attempt.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Available balance in minor units.
    async fn get_available_balance(
        &self,
        owner_id: &str,
        asset_code: &str,
    ) -> Result<u128, WalletError>;

    /// Move funds from available to reserved for this withdrawal.
    async fn reserve_funds(
        &self,
        withdrawal_id: &str,
        owner_id: &str,
        asset_code: &str,
        amount_minor: u128,
    ) -> Result<(), WalletError>;

    /// Settle the reservation after a successful broadcast.
    async fn mark_withdrawal_completed(
        &self,
        withdrawal_id: &str,
        tx_id: &str,
    ) -> Result<(), WalletError>;

    /// Return reserved funds after a failed broadcast. `reason` carries the
    /// failure detail for the ledger's audit trail.
    async fn release_reservation(&self, withdrawal_id: &str, reason: &str)
        -> Result<(), WalletError>;
}
