mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use custody_wallet::application::wallet_command::{WalletCommand, WalletCommandService};
use custody_wallet::core::kms_only::KmsOnlyKeyManager;
use custody_wallet::crypto::envelope::EnvelopeProfile;
use custody_wallet::kms::LocalKms;
use custody_wallet::storage::memory::MemoryWalletRepository;
use custody_wallet::WalletError;

use common::sealed_stack;

#[tokio::test]
async fn create_wallet_from_json_payload() {
    let stack = sealed_stack(EnvelopeProfile::DataKey);
    let service = WalletCommandService::new(stack.manager.clone(), stack.wallets.clone());

    let payload =
        r#"{"type":"CREATE_WALLET","ownerId":"alice","chain":"eth","assetCode":"usdt-erc20"}"#;
    let wallet = service.handle_json(payload).await.unwrap();
    assert_eq!(wallet.owner_id, "alice");
    assert_eq!(wallet.asset_code, "USDT-ERC20");
    assert!(wallet.address.starts_with("0x"));
}

#[tokio::test]
async fn derive_address_routes_to_hd_manager() {
    let stack = sealed_stack(EnvelopeProfile::DataKey);
    let service = WalletCommandService::new(stack.manager.clone(), stack.wallets.clone());

    let wallet = service
        .handle(WalletCommand::CreateWallet {
            owner_id: "alice".to_string(),
            chain: "TRX".to_string(),
            asset_code: "TRX".to_string(),
        })
        .await
        .unwrap();

    let derived = service
        .handle(WalletCommand::DeriveAddress {
            wallet_id: wallet.wallet_id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(derived.derivation_index, Some(1));
    assert_ne!(derived.address, wallet.address);
}

#[tokio::test]
async fn derive_address_refused_without_hd_capability() {
    let wallets = Arc::new(MemoryWalletRepository::new());
    let manager = Arc::new(KmsOnlyKeyManager::new(Arc::new(LocalKms::new()), wallets.clone()));
    let service = WalletCommandService::new(manager, wallets);

    let result = service
        .handle(WalletCommand::DeriveAddress {
            wallet_id: "w-1".to_string(),
        })
        .await;
    assert!(matches!(result, Err(WalletError::ValidationError(_))));
}

#[tokio::test]
async fn derive_address_for_unknown_wallet() {
    let stack = sealed_stack(EnvelopeProfile::DataKey);
    let service = WalletCommandService::new(stack.manager.clone(), stack.wallets.clone());

    let result = service
        .handle(WalletCommand::DeriveAddress {
            wallet_id: "missing".to_string(),
        })
        .await;
    assert!(matches!(result, Err(WalletError::NotFoundError(_))));
}

#[tokio::test]
async fn unknown_chain_is_rejected() {
    let stack = sealed_stack(EnvelopeProfile::DataKey);
    let service = WalletCommandService::new(stack.manager.clone(), stack.wallets.clone());

    let result = service
        .handle(WalletCommand::CreateWallet {
            owner_id: "alice".to_string(),
            chain: "DOGE".to_string(),
            asset_code: "DOGE".to_string(),
        })
        .await;
    assert!(matches!(result, Err(WalletError::UnsupportedChain(_))));
}
