use thiserror::Error;

/// Custom error type for wallet operations.
///
/// Domain withdrawal outcomes (insufficient balance, unsupported asset,
/// broadcast rejection) are not errors; they are returned as
/// `WithdrawalOutcome` variants. This enum covers faults.
#[derive(Debug, Error)]
pub enum WalletError {
    /// A DER/SPKI public key blob failed structural validation.
    #[error("Malformed public key: {0}")]
    MalformedKey(String),
    /// A DER ECDSA signature failed structural validation.
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
    /// A SEC1 point had the wrong prefix or length.
    #[error("Invalid curve point: {0}")]
    InvalidPoint(String),
    /// Chain not handled by the requested operation.
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),
    /// Asset not handled by the requested operation.
    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(String),
    /// No recovery id candidate reproduced the signing key.
    #[error("Recovery id resolution failed: {0}")]
    RecoveryFailed(String),
    /// Envelope decryption failed (KMS unwrap or AEAD tag).
    #[error("Unseal failed: {0}")]
    UnsealError(String),
    /// KMS collaborator failure.
    #[error("KMS error: {0}")]
    KmsError(String),
    /// Storage collaborator failure.
    #[error("Storage error: {0}")]
    StorageError(String),
    /// Ledger collaborator failure.
    #[error("Ledger error: {0}")]
    LedgerError(String),
    /// Transaction could not be finalized or accepted by the network.
    #[error("Broadcast error: {0}")]
    BroadcastError(String),
    /// HD child key derivation failure.
    #[error("Key derivation error: {0}")]
    KeyDerivationError(String),
    /// Mnemonic generation/parsing failure.
    #[error("Mnemonic error: {0}")]
    MnemonicError(String),
    /// Input failed validation.
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Amount string could not be converted to minor units.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFoundError(String),
    /// ECDSA signing failure.
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl WalletError {
    /// Errors that indicate a cryptographic integrity problem rather than a
    /// transient collaborator failure.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            WalletError::RecoveryFailed(_)
                | WalletError::UnsealError(_)
                | WalletError::SigningFailed(_)
                | WalletError::InternalError(_)
        )
    }

    /// Errors worth retrying after broker redelivery.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::KmsError(_)
                | WalletError::StorageError(_)
                | WalletError::LedgerError(_)
        )
    }
}

impl From<anyhow::Error> for WalletError {
    fn from(err: anyhow::Error) -> Self {
        WalletError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::ValidationError(err.to_string())
    }
}
