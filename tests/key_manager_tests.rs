mod common;

use std::sync::Arc;

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};

use custody_wallet::core::domain::{Chain, CustodyKind};
use custody_wallet::core::key_manager::KeyManager;
use custody_wallet::core::kms_only::KmsOnlyKeyManager;
use custody_wallet::crypto::envelope::EnvelopeProfile;
use custody_wallet::kms::LocalKms;
use custody_wallet::storage::memory::MemoryWalletRepository;
use custody_wallet::storage::SealedSecretRepository;
use custody_wallet::WalletError;

use common::sealed_stack;

fn kms_only_manager() -> KmsOnlyKeyManager {
    KmsOnlyKeyManager::new(
        Arc::new(LocalKms::new()),
        Arc::new(MemoryWalletRepository::new()),
    )
}

#[tokio::test]
async fn kms_only_creates_chain_addresses() {
    let manager = kms_only_manager();

    let eth = manager.create_wallet("alice", Chain::Eth, "ETH").await.unwrap();
    assert!(eth.address.starts_with("0x"));
    assert_eq!(eth.address.len(), 42);
    assert_eq!(eth.custody, CustodyKind::KmsOnly);
    assert!(eth.kms_key_id.is_some());
    assert!(eth.secret_id.is_none());

    let btc = manager.create_wallet("alice", Chain::Btc, "BTC").await.unwrap();
    assert!(btc.address.starts_with('1'));

    let trx = manager.create_wallet("alice", Chain::Trx, "TRX").await.unwrap();
    assert!(trx.address.starts_with('T'));
}

#[tokio::test]
async fn kms_only_signature_has_chain_v() {
    let manager = kms_only_manager();
    let digest = [0x5a; 32];

    let eth = manager.create_wallet("alice", Chain::Eth, "ETH").await.unwrap();
    let sig = manager.sign_digest(&eth, &digest).await.unwrap();
    assert!(sig.recovery.unwrap() <= 1);
    assert!(matches!(sig.v, Some(27) | Some(28)));
    assert_eq!(sig.r.len(), 64);
    assert_eq!(sig.s.len(), 64);
    assert_eq!(sig.compact_hex, format!("{}{}", sig.r, sig.s));

    let btc = manager.create_wallet("alice", Chain::Btc, "BTC").await.unwrap();
    let sig = manager.sign_digest(&btc, &digest).await.unwrap();
    assert_eq!(sig.v, None);
    assert!(sig.recovery.unwrap() <= 1);

    let trx = manager.create_wallet("alice", Chain::Trx, "TRX").await.unwrap();
    let sig = manager.sign_digest(&trx, &digest).await.unwrap();
    assert!(matches!(sig.v, Some(0) | Some(1)));
}

#[tokio::test]
async fn kms_only_has_no_hd_capability() {
    let manager = kms_only_manager();
    assert!(manager.as_hd().is_none());
}

#[tokio::test]
async fn sealed_hd_creates_wallet_at_index_zero() {
    let stack = sealed_stack(EnvelopeProfile::DataKey);
    let wallet = stack
        .manager
        .create_wallet("bob", Chain::Trx, "TRX")
        .await
        .unwrap();

    assert_eq!(wallet.custody, CustodyKind::SealedHd);
    assert!(wallet.address.starts_with('T'));
    assert_eq!(wallet.derivation_index, Some(0));
    assert_eq!(wallet.derivation_path.as_deref(), Some("m/44'/195'/0'/0/0"));
    assert!(wallet.secret_id.is_some());
    assert!(wallet.kms_key_id.is_none());

    let sealed = stack
        .secrets
        .find(wallet.secret_id.as_deref().unwrap())
        .await
        .unwrap();
    assert!(sealed.is_some());
}

#[tokio::test]
async fn sealed_hd_derive_address_advances_index() {
    let stack = sealed_stack(EnvelopeProfile::DataKey);
    let wallet = stack
        .manager
        .create_wallet("bob", Chain::Eth, "ETH")
        .await
        .unwrap();
    let hd = stack.manager.as_hd().expect("sealed-HD manager exposes HD");

    let second = hd.derive_address(&wallet).await.unwrap();
    let third = hd.derive_address(&wallet).await.unwrap();

    assert_eq!(second.derivation_index, Some(1));
    assert_eq!(third.derivation_index, Some(2));
    assert_eq!(second.secret_id, wallet.secret_id);
    assert_ne!(second.address, wallet.address);
    assert_ne!(third.address, second.address);
    assert_eq!(second.derivation_path.as_deref(), Some("m/44'/60'/0'/0/1"));
}

#[tokio::test]
async fn sealed_hd_signature_verifies_against_derived_key() {
    let stack = sealed_stack(EnvelopeProfile::WrappedLocal);
    let wallet = stack
        .manager
        .create_wallet("bob", Chain::Eth, "ETH")
        .await
        .unwrap();
    let digest = [0xc3; 32];

    let result = stack.manager.sign_digest(&wallet, &digest).await.unwrap();

    let key = stack.keys.derive_wallet_key(&wallet).await.unwrap();
    let verifier = VerifyingKey::from_sec1_bytes(&key.public_key_uncompressed).unwrap();
    let compact = hex::decode(&result.compact_hex).unwrap();
    let signature = Signature::from_slice(&compact).unwrap();
    verifier.verify_prehash(&digest, &signature).unwrap();
    assert_eq!(key.address, wallet.address);
}

#[tokio::test]
async fn sealed_hd_sign_rejects_foreign_record() {
    let stack = sealed_stack(EnvelopeProfile::DataKey);
    let mut wallet = stack
        .manager
        .create_wallet("bob", Chain::Eth, "ETH")
        .await
        .unwrap();
    wallet.secret_id = Some("missing-secret".to_string());
    assert!(matches!(
        stack.manager.sign_digest(&wallet, &[0u8; 32]).await,
        Err(WalletError::NotFoundError(_))
    ));
}
