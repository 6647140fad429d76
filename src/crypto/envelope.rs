//! Envelope encryption for sealed wallet secrets.
//!
//! A secret is encrypted locally with a one-shot AES-256-GCM data key; the
//! data key itself is protected by the KMS. The encryption context binds the
//! sealed record to its owner and deployment environment both at the KMS
//! (request context) and in the AEAD (associated data), so a record cannot
//! be unsealed for a different owner or environment.
//!
//! Two sealing profiles exist, differing only in where the data key is
//! minted. Records are interchangeable at rest: unsealing always goes
//! through KMS decrypt.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::core::domain::SealedSecret;
use crate::core::errors::WalletError;
use crate::kms::{EncryptionContext, KmsClient};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Where the data key comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvelopeProfile {
    /// KMS mints the data key and returns both plaintext and wrapped forms.
    DataKey,
    /// The data key is generated locally and wrapped via KMS encrypt.
    WrappedLocal,
}

#[derive(Clone)]
pub struct EnvelopeCipher {
    kms: Arc<dyn KmsClient>,
    profile: EnvelopeProfile,
    env_label: String,
}

impl EnvelopeCipher {
    pub fn new(kms: Arc<dyn KmsClient>, profile: EnvelopeProfile, env_label: impl Into<String>) -> Self {
        Self {
            kms,
            profile,
            env_label: env_label.into(),
        }
    }

    fn context(&self, owner_id: &str) -> EncryptionContext {
        EncryptionContext::new(owner_id, self.env_label.clone())
    }

    /// Seal a plaintext secret for an owner.
    pub async fn seal(&self, owner_id: &str, plaintext: &str) -> Result<SealedSecret, WalletError> {
        let context = self.context(owner_id);
        let (data_key, wrapped_key) = match self.profile {
            EnvelopeProfile::DataKey => self.kms.generate_data_key(&context).await?,
            EnvelopeProfile::WrappedLocal => {
                let mut key = Zeroizing::new(vec![0u8; 32]);
                OsRng.fill_bytes(key.as_mut_slice());
                let wrapped = self.kms.encrypt(&key, &context).await?;
                (key, wrapped)
            }
        };

        let cipher = Aes256Gcm::new_from_slice(&data_key)
            .map_err(|_| WalletError::InternalError("data key is not 32 bytes".to_string()))?;
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let aad = context.to_aad();
        let mut sealed = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &aad,
                },
            )
            .map_err(|_| WalletError::InternalError("AEAD seal failed".to_string()))?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        let secret = SealedSecret {
            secret_id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            ciphertext_b64: B64.encode(&sealed),
            nonce_b64: B64.encode(nonce),
            tag_b64: B64.encode(tag),
            wrapped_key_b64: B64.encode(wrapped_key),
            created_at: Utc::now(),
        };
        debug!(secret_id = %secret.secret_id, owner_id, "sealed secret");
        Ok(secret)
    }

    /// Recover the plaintext of a sealed secret. Fails closed: no partial
    /// plaintext ever leaves this function.
    pub async fn unseal(&self, secret: &SealedSecret) -> Result<Zeroizing<String>, WalletError> {
        let context = self.context(&secret.owner_id);
        let wrapped_key = decode_field(&secret.wrapped_key_b64, "wrappedKey")?;
        let nonce = decode_field(&secret.nonce_b64, "nonce")?;
        let ciphertext = decode_field(&secret.ciphertext_b64, "ciphertext")?;
        let tag = decode_field(&secret.tag_b64, "tag")?;
        if nonce.len() != NONCE_LEN {
            return Err(WalletError::UnsealError(format!(
                "nonce is {} bytes, want {}",
                nonce.len(),
                NONCE_LEN
            )));
        }
        if tag.len() != TAG_LEN {
            return Err(WalletError::UnsealError(format!(
                "tag is {} bytes, want {}",
                tag.len(),
                TAG_LEN
            )));
        }

        let data_key = self.kms.decrypt(&wrapped_key, &context).await.map_err(|e| {
            error!(secret_id = %secret.secret_id, error = %e, "data key unwrap failed");
            WalletError::UnsealError(format!("data key unwrap: {}", e))
        })?;
        let cipher = Aes256Gcm::new_from_slice(&data_key)
            .map_err(|_| WalletError::UnsealError("unwrapped data key is not 32 bytes".to_string()))?;

        let mut msg = ciphertext;
        msg.extend_from_slice(&tag);
        let aad = context.to_aad();
        let plain = cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload { msg: &msg, aad: &aad },
            )
            .map_err(|_| {
                error!(secret_id = %secret.secret_id, "AEAD authentication failed");
                WalletError::UnsealError("authentication failed".to_string())
            })?;
        let plain = Zeroizing::new(plain);
        String::from_utf8(plain.to_vec())
            .map(Zeroizing::new)
            .map_err(|_| WalletError::UnsealError("plaintext is not UTF-8".to_string()))
    }
}

fn decode_field(b64: &str, field: &str) -> Result<Vec<u8>, WalletError> {
    B64.decode(b64)
        .map_err(|e| WalletError::UnsealError(format!("{} is not base64: {}", field, e)))
}
