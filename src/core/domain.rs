//! Domain types shared across custody, signing and withdrawal flows.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::core::errors::WalletError;

/// Supported blockchains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
    Btc,
    Eth,
    Trx,
}

impl Chain {
    /// BIP44 coin type (SLIP-44 registered values).
    pub fn coin_type(&self) -> u32 {
        match self {
            Chain::Btc => 0,
            Chain::Eth => 60,
            Chain::Trx => 195,
        }
    }

    /// Parse a chain label, case-insensitive.
    pub fn parse(s: &str) -> Result<Self, WalletError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BTC" => Ok(Chain::Btc),
            "ETH" => Ok(Chain::Eth),
            "TRX" => Ok(Chain::Trx),
            other => Err(WalletError::UnsupportedChain(other.to_string())),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Chain::Btc => "BTC",
            Chain::Eth => "ETH",
            Chain::Trx => "TRX",
        };
        write!(f, "{}", label)
    }
}

/// Assets accepted for withdrawal, with their fixed minor-unit precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalAsset {
    #[serde(rename = "BTC")]
    Btc,
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "USDT-ERC20")]
    UsdtErc20,
    #[serde(rename = "TRX")]
    Trx,
    #[serde(rename = "USDT-TRC20")]
    UsdtTrc20,
}

impl WithdrawalAsset {
    /// Parse an already-uppercased asset code. Returns None for unknown codes.
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "BTC" => Some(WithdrawalAsset::Btc),
            "ETH" => Some(WithdrawalAsset::Eth),
            "USDT-ERC20" => Some(WithdrawalAsset::UsdtErc20),
            "TRX" => Some(WithdrawalAsset::Trx),
            "USDT-TRC20" => Some(WithdrawalAsset::UsdtTrc20),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WithdrawalAsset::Btc => "BTC",
            WithdrawalAsset::Eth => "ETH",
            WithdrawalAsset::UsdtErc20 => "USDT-ERC20",
            WithdrawalAsset::Trx => "TRX",
            WithdrawalAsset::UsdtTrc20 => "USDT-TRC20",
        }
    }

    /// Decimal places of one whole unit.
    pub fn decimals(&self) -> u32 {
        match self {
            WithdrawalAsset::Btc => 8,
            WithdrawalAsset::Eth => 18,
            WithdrawalAsset::UsdtErc20 => 6,
            WithdrawalAsset::Trx => 6,
            WithdrawalAsset::UsdtTrc20 => 6,
        }
    }

    /// Chain this asset settles on.
    pub fn chain(&self) -> Chain {
        match self {
            WithdrawalAsset::Btc => Chain::Btc,
            WithdrawalAsset::Eth | WithdrawalAsset::UsdtErc20 => Chain::Eth,
            WithdrawalAsset::Trx | WithdrawalAsset::UsdtTrc20 => Chain::Trx,
        }
    }

    /// Token contract assets, as opposed to chain-native coins.
    pub fn is_token(&self) -> bool {
        matches!(self, WithdrawalAsset::UsdtErc20 | WithdrawalAsset::UsdtTrc20)
    }
}

impl fmt::Display for WithdrawalAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// How the wallet's signing key is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustodyKind {
    KmsOnly,
    SealedHd,
}

/// Persisted wallet. Either `kms_key_id` (KMS-only custody) or
/// `secret_id` + derivation fields (sealed-HD custody) is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub wallet_id: String,
    pub owner_id: String,
    pub chain: Chain,
    pub asset_code: String,
    pub address: String,
    pub custody: CustodyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Envelope-encrypted secret at rest. All binary fields are base64.
/// The layout is identical for both sealing profiles, so records are
/// interchangeable regardless of which profile produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedSecret {
    pub secret_id: String,
    pub owner_id: String,
    pub ciphertext_b64: String,
    pub nonce_b64: String,
    pub tag_b64: String,
    pub wrapped_key_b64: String,
    pub created_at: DateTime<Utc>,
}

/// Typed repository lookups.
#[derive(Debug, Clone)]
pub enum WalletQuery {
    ById(String),
    ByOwnerAsset { owner_id: String, asset_code: String },
}

/// Signature in the shape downstream chain code consumes.
/// `v` carries the chain-specific recovery value where the chain uses one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureResult {
    /// 32-byte big-endian r, hex.
    pub r: String,
    /// 32-byte big-endian low-s, hex.
    pub s: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery: Option<u8>,
    /// r || s, hex.
    pub compact_hex: String,
}

/// Key material for one derived HD child. Private bytes are zeroized on drop.
pub struct DerivedWalletKey {
    pub private_key: Zeroizing<[u8; 32]>,
    pub public_key_uncompressed: [u8; 65],
    pub address: String,
    pub path: String,
}
