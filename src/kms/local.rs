//! Software KMS backend.
//!
//! Simulates the cloud KMS surface in-process: asymmetric keys live in a
//! table, data keys are wrapped under a per-instance AES-256-GCM master key
//! with the encryption context as associated data. Wrapped material is only
//! valid for the `LocalKms` instance that produced it.

use std::collections::HashMap;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::core::errors::WalletError;
use crate::crypto::codec::SEC1_SPKI_PREFIX;
use crate::kms::{EncryptionContext, KmsClient};

const NONCE_LEN: usize = 12;
const DATA_KEY_LEN: usize = 32;

pub struct LocalKms {
    master: Aes256Gcm,
    signing_keys: Mutex<HashMap<String, SigningKey>>,
}

impl LocalKms {
    pub fn new() -> Self {
        let mut master_key = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(master_key.as_mut());
        let master = Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(master_key.as_ref()));
        Self {
            master,
            signing_keys: Mutex::new(HashMap::new()),
        }
    }

    fn wrap(&self, plaintext: &[u8], context: &EncryptionContext) -> Result<Vec<u8>, WalletError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let aad = context.to_aad();
        let sealed = self
            .master
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| WalletError::KmsError("wrap failed".to_string()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn unwrap(
        &self,
        ciphertext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        if ciphertext.len() < NONCE_LEN + 16 {
            return Err(WalletError::KmsError("ciphertext too short".to_string()));
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);
        let aad = context.to_aad();
        let plain = self
            .master
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: &aad,
                },
            )
            .map_err(|_| WalletError::KmsError("unwrap failed".to_string()))?;
        Ok(Zeroizing::new(plain))
    }
}

impl Default for LocalKms {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KmsClient for LocalKms {
    async fn create_signing_key(&self, label: &str) -> Result<String, WalletError> {
        let key = SigningKey::random(&mut OsRng);
        let key_id = format!("local/{}/{}", label, Uuid::new_v4());
        self.signing_keys.lock().insert(key_id.clone(), key);
        Ok(key_id)
    }

    async fn get_public_key_der(&self, key_id: &str) -> Result<Vec<u8>, WalletError> {
        let keys = self.signing_keys.lock();
        let key = keys
            .get(key_id)
            .ok_or_else(|| WalletError::KmsError(format!("unknown key id: {}", key_id)))?;
        let point = key.verifying_key().to_encoded_point(false);
        let mut der = SEC1_SPKI_PREFIX.to_vec();
        der.extend_from_slice(point.as_bytes());
        Ok(der)
    }

    async fn sign_digest(&self, key_id: &str, digest: &[u8; 32]) -> Result<Vec<u8>, WalletError> {
        let keys = self.signing_keys.lock();
        let key = keys
            .get(key_id)
            .ok_or_else(|| WalletError::KmsError(format!("unknown key id: {}", key_id)))?;
        let signature: Signature = key
            .sign_prehash(digest)
            .map_err(|e| WalletError::KmsError(format!("sign: {}", e)))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    async fn generate_data_key(
        &self,
        context: &EncryptionContext,
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>), WalletError> {
        let mut key = Zeroizing::new(vec![0u8; DATA_KEY_LEN]);
        OsRng.fill_bytes(key.as_mut_slice());
        let wrapped = self.wrap(&key, context)?;
        Ok((key, wrapped))
    }

    async fn encrypt(
        &self,
        plaintext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, WalletError> {
        self.wrap(plaintext, context)
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        self.unwrap(ciphertext, context)
    }
}
