//! Service configuration.
//!
//! Everything deployment-dependent is resolved into one `CustodyConfig` at
//! startup; business logic never reads the environment.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::WalletError;
use crate::crypto::envelope::EnvelopeProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CustodyMode {
    KmsOnly,
    SealedHd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KmsBackend {
    Local,
    Aws,
    Gcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BroadcastVendor {
    /// Self-hosted node RPC.
    NodeRpc,
    Tatum,
    CryptoApis,
}

/// Third-party broadcast provider settings as they come from deployment
/// config. `active` is the literal flag string; only "yes" activates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    pub api_key: String,
    pub api_url: String,
    pub active: String,
}

impl ProviderSettings {
    pub fn is_active(&self) -> bool {
        self.active == "yes"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    pub usdt_erc20_contract: String,
    pub usdt_trc20_contract: String,
    /// Energy budget for TRC-20 triggers, in sun.
    pub trx_fee_limit_sun: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            usdt_erc20_contract: "0xdac17f958d2ee523a2206206994597c13d831ec7".to_string(),
            usdt_trc20_contract: "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t".to_string(),
            trx_fee_limit_sun: 10_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustodyConfig {
    pub custody_mode: CustodyMode,
    pub kms_backend: KmsBackend,
    pub envelope_profile: EnvelopeProfile,
    /// Deployment label baked into encryption contexts; sealed secrets from
    /// one environment cannot be unsealed in another.
    pub env_label: String,
    pub wallet_commands_topic: String,
    pub withdrawal_requests_topic: String,
    pub withdrawal_events_topic: String,
    pub tokens: TokenConfig,
    pub tatum: ProviderSettings,
    pub cryptoapis: ProviderSettings,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            custody_mode: CustodyMode::SealedHd,
            kms_backend: KmsBackend::Local,
            envelope_profile: EnvelopeProfile::DataKey,
            env_label: "dev".to_string(),
            wallet_commands_topic: "wallet.commands".to_string(),
            withdrawal_requests_topic: "withdrawal.requests".to_string(),
            withdrawal_events_topic: "withdrawal.events".to_string(),
            tokens: TokenConfig::default(),
            tatum: ProviderSettings::default(),
            cryptoapis: ProviderSettings::default(),
        }
    }
}

impl CustodyConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| WalletError::ValidationError(format!("config read: {}", e)))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Which vendor broadcasts transactions. Tatum wins over CryptoAPIs when
    /// both are active; neither active means self-hosted node RPC.
    pub fn broadcast_vendor(&self) -> BroadcastVendor {
        if self.tatum.is_active() {
            BroadcastVendor::Tatum
        } else if self.cryptoapis.is_active() {
            BroadcastVendor::CryptoApis
        } else {
            BroadcastVendor::NodeRpc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_is_strict_yes() {
        let mut provider = ProviderSettings::default();
        assert!(!provider.is_active());
        for not_yes in ["true", "1", "YES", "Yes", "no", " yes"] {
            provider.active = not_yes.to_string();
            assert!(!provider.is_active(), "{:?} must not activate", not_yes);
        }
        provider.active = "yes".to_string();
        assert!(provider.is_active());
    }

    #[test]
    fn test_vendor_precedence() {
        let mut config = CustodyConfig::default();
        assert_eq!(config.broadcast_vendor(), BroadcastVendor::NodeRpc);
        config.cryptoapis.active = "yes".to_string();
        assert_eq!(config.broadcast_vendor(), BroadcastVendor::CryptoApis);
        config.tatum.active = "yes".to_string();
        assert_eq!(config.broadcast_vendor(), BroadcastVendor::Tatum);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: CustodyConfig =
            serde_json::from_str(r#"{"custodyMode":"kms-only","envLabel":"prod"}"#).unwrap();
        assert_eq!(config.custody_mode, CustodyMode::KmsOnly);
        assert_eq!(config.env_label, "prod");
        assert_eq!(config.kms_backend, KmsBackend::Local);
        assert_eq!(config.withdrawal_events_topic, "withdrawal.events");
    }
}
