//! Wallet command intake.
//!
//! Commands arrive from the broker as tagged JSON. DERIVE_ADDRESS is only
//! routed to custody strategies that expose the HD capability; with KMS-only
//! custody the command is refused up front.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::domain::{Chain, WalletQuery, WalletRecord};
use crate::core::errors::WalletError;
use crate::core::key_manager::KeyManager;
use crate::storage::WalletRepository;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletCommand {
    #[serde(rename_all = "camelCase")]
    CreateWallet {
        owner_id: String,
        chain: String,
        asset_code: String,
    },
    #[serde(rename_all = "camelCase")]
    DeriveAddress { wallet_id: String },
}

pub struct WalletCommandService {
    manager: Arc<dyn KeyManager>,
    wallets: Arc<dyn WalletRepository>,
}

impl WalletCommandService {
    pub fn new(manager: Arc<dyn KeyManager>, wallets: Arc<dyn WalletRepository>) -> Self {
        Self { manager, wallets }
    }

    /// Decode and handle a raw broker payload.
    pub async fn handle_json(&self, payload: &str) -> Result<WalletRecord, WalletError> {
        let command: WalletCommand = serde_json::from_str(payload)?;
        self.handle(command).await
    }

    pub async fn handle(&self, command: WalletCommand) -> Result<WalletRecord, WalletError> {
        match command {
            WalletCommand::CreateWallet {
                owner_id,
                chain,
                asset_code,
            } => {
                let chain = Chain::parse(&chain)?;
                let asset_code = asset_code.trim().to_ascii_uppercase();
                info!(%owner_id, %chain, %asset_code, "CREATE_WALLET");
                self.manager.create_wallet(&owner_id, chain, &asset_code).await
            }
            WalletCommand::DeriveAddress { wallet_id } => {
                let hd = self.manager.as_hd().ok_or_else(|| {
                    WalletError::ValidationError(
                        "active key manager does not support address derivation".to_string(),
                    )
                })?;
                let wallet = self
                    .wallets
                    .find(&WalletQuery::ById(wallet_id.clone()))
                    .await?
                    .ok_or_else(|| WalletError::NotFoundError(format!("wallet {}", wallet_id)))?;
                info!(%wallet_id, "DERIVE_ADDRESS");
                hd.derive_address(&wallet).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let payload = r#"{"type":"CREATE_WALLET","ownerId":"alice","chain":"eth","assetCode":"eth"}"#;
        let command: WalletCommand = serde_json::from_str(payload).unwrap();
        assert!(matches!(
            command,
            WalletCommand::CreateWallet { ref owner_id, .. } if owner_id == "alice"
        ));

        let payload = r#"{"type":"DERIVE_ADDRESS","walletId":"w-1"}"#;
        let command: WalletCommand = serde_json::from_str(payload).unwrap();
        assert!(matches!(
            command,
            WalletCommand::DeriveAddress { ref wallet_id } if wallet_id == "w-1"
        ));
    }

    #[test]
    fn test_unknown_command_rejected() {
        let payload = r#"{"type":"ROTATE_KEYS","walletId":"w-1"}"#;
        assert!(serde_json::from_str::<WalletCommand>(payload).is_err());
    }
}
