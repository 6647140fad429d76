//! Ethereum withdrawal adapter.
//!
//! Native transfers and ERC-20 `transfer` calls, signed locally as legacy
//! EIP-155 transactions and pushed through the RPC collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use tracing::info;

use crate::core::domain::WithdrawalAsset;
use crate::core::errors::WalletError;
use crate::core::hd_keys::HdWalletKeyService;
use crate::withdrawal::adapters::{BroadcastResult, ChainWithdrawalAdapter, WithdrawalContext};

/// transfer(address,uint256)
const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
const NATIVE_TRANSFER_GAS: u64 = 21_000;
const ERC20_TRANSFER_GAS: u64 = 100_000;

/// Ethereum JSON-RPC surface the adapter depends on.
#[async_trait]
pub trait EthereumRpc: Send + Sync {
    /// Pending-state nonce for an address.
    async fn transaction_count(&self, address: &str) -> Result<u64, WalletError>;
    async fn gas_price(&self) -> Result<u128, WalletError>;
    async fn chain_id(&self) -> Result<u64, WalletError>;
    /// Returns the transaction hash.
    async fn send_raw_transaction(&self, raw_hex: &str) -> Result<String, WalletError>;
}

pub struct EthereumWithdrawalAdapter {
    rpc: Arc<dyn EthereumRpc>,
    keys: Arc<HdWalletKeyService>,
    usdt_contract: String,
}

impl EthereumWithdrawalAdapter {
    pub fn new(
        rpc: Arc<dyn EthereumRpc>,
        keys: Arc<HdWalletKeyService>,
        usdt_contract: impl Into<String>,
    ) -> Self {
        Self {
            rpc,
            keys,
            usdt_contract: usdt_contract.into(),
        }
    }
}

/// ABI-encode an ERC-20 transfer call: selector plus two 32-byte words.
fn erc20_transfer_calldata(to: Address, amount: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(&ERC20_TRANSFER_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(to.as_bytes());
    let mut amount_word = [0u8; 32];
    amount.to_big_endian(&mut amount_word);
    data.extend_from_slice(&amount_word);
    data
}

fn parse_address(s: &str) -> Result<Address, WalletError> {
    s.parse::<Address>()
        .map_err(|e| WalletError::ValidationError(format!("address {}: {}", s, e)))
}

#[async_trait]
impl ChainWithdrawalAdapter for EthereumWithdrawalAdapter {
    fn supports(&self, asset: WithdrawalAsset) -> bool {
        matches!(asset, WithdrawalAsset::Eth | WithdrawalAsset::UsdtErc20)
    }

    async fn execute(&self, context: &WithdrawalContext) -> Result<BroadcastResult, WalletError> {
        let key = self.keys.derive_wallet_key(&context.wallet).await?;
        let chain_id = self.rpc.chain_id().await?;
        let signer = LocalWallet::from_bytes(&key.private_key[..])
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?
            .with_chain_id(chain_id);

        let nonce = self.rpc.transaction_count(&context.wallet.address).await?;
        let gas_price = self.rpc.gas_price().await?;
        let destination = parse_address(&context.destination)?;
        let amount = U256::from(context.amount_minor);

        let tx = match context.asset {
            WithdrawalAsset::Eth => TransactionRequest::new()
                .to(destination)
                .value(amount)
                .gas(NATIVE_TRANSFER_GAS),
            WithdrawalAsset::UsdtErc20 => {
                let contract = parse_address(&self.usdt_contract)?;
                TransactionRequest::new()
                    .to(contract)
                    .value(U256::zero())
                    .gas(ERC20_TRANSFER_GAS)
                    .data(Bytes::from(erc20_transfer_calldata(destination, amount)))
            }
            other => {
                return Err(WalletError::UnsupportedAsset(other.to_string()));
            }
        }
        .nonce(nonce)
        .gas_price(gas_price)
        .chain_id(chain_id);

        let typed: TypedTransaction = tx.into();
        let signature = signer
            .sign_transaction(&typed)
            .await
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        let raw = typed.rlp_signed(&signature);
        let raw_hex = format!("0x{}", hex::encode(&raw));

        let txid = self.rpc.send_raw_transaction(&raw_hex).await?;
        info!(
            withdrawal_id = %context.withdrawal_id,
            %txid,
            asset = %context.asset,
            nonce,
            "broadcast ETH transaction"
        );
        Ok(BroadcastResult::from_txid(txid))
    }
}
