//! ECDSA public key recovery id resolution.
//!
//! KMS backends return plain (r, s) signatures with no recovery information,
//! but Ethereum-style chains need the recovery id on the wire. Recover it by
//! trying each candidate id and comparing the recovered key against the
//! wallet's known public key.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use tracing::warn;

use crate::core::domain::Chain;
use crate::core::errors::WalletError;

/// Find the recovery id for a signature over `digest` made by the key whose
/// uncompressed public point is `expected`.
///
/// Candidates 0..4 are tried; ids 2 and 3 (reduced-x points) collapse to
/// their parity bit in the result. Individual candidate failures are normal.
/// Exhausting all four means the signature does not belong to the expected
/// key, which is a custody integrity fault.
pub fn resolve_recovery_id(
    digest: &[u8; 32],
    r: &[u8; 32],
    s: &[u8; 32],
    expected: &[u8; 65],
) -> Result<u8, WalletError> {
    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(r);
    compact[32..].copy_from_slice(s);
    let signature = Signature::from_slice(&compact)
        .map_err(|e| WalletError::MalformedSignature(e.to_string()))?;

    for candidate in 0..4u8 {
        let recovery_id = match RecoveryId::from_byte(candidate) {
            Some(id) => id,
            None => continue,
        };
        let recovered = match VerifyingKey::recover_from_prehash(digest, &signature, recovery_id) {
            Ok(key) => key,
            Err(_) => continue,
        };
        if recovered.to_encoded_point(false).as_bytes() == expected {
            return Ok(candidate & 1);
        }
    }

    warn!("no recovery id candidate reproduced the signing key");
    Err(WalletError::RecoveryFailed(
        "signature does not recover to the wallet public key".to_string(),
    ))
}

/// Canonicalize a signature to its low-s form, as chains require.
pub fn normalize_signature(r: [u8; 32], s: [u8; 32]) -> Result<([u8; 32], [u8; 32]), WalletError> {
    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&r);
    compact[32..].copy_from_slice(&s);
    let signature = Signature::from_slice(&compact)
        .map_err(|e| WalletError::MalformedSignature(e.to_string()))?;
    let signature = signature.normalize_s().unwrap_or(signature);
    let bytes = signature.to_bytes();
    let mut out_r = [0u8; 32];
    let mut out_s = [0u8; 32];
    out_r.copy_from_slice(&bytes[..32]);
    out_s.copy_from_slice(&bytes[32..]);
    Ok((out_r, out_s))
}

/// Chain-specific `v` value for a recovery id. Bitcoin signatures carry no
/// recovery information.
pub fn chain_v(chain: Chain, recovery: u8) -> Option<u64> {
    match chain {
        Chain::Eth => Some(27 + recovery as u64),
        Chain::Trx => Some(recovery as u64),
        Chain::Btc => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{signature::hazmat::PrehashSigner, SigningKey};

    fn split(sig: &Signature) -> ([u8; 32], [u8; 32]) {
        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        (r, s)
    }

    #[test]
    fn test_resolves_own_signature() {
        let key = SigningKey::from_slice(&[0x17; 32]).unwrap();
        let point = key.verifying_key().to_encoded_point(false);
        let mut expected = [0u8; 65];
        expected.copy_from_slice(point.as_bytes());

        for digest_byte in [0x01u8, 0x5a, 0xfe] {
            let digest = [digest_byte; 32];
            let sig: Signature = key.sign_prehash(&digest).unwrap();
            let (r, s) = split(&sig);
            let recovery = resolve_recovery_id(&digest, &r, &s, &expected).unwrap();
            assert!(recovery <= 1);
        }
    }

    #[test]
    fn test_foreign_key_fails() {
        let signer = SigningKey::from_slice(&[0x17; 32]).unwrap();
        let other = SigningKey::from_slice(&[0x18; 32]).unwrap();
        let point = other.verifying_key().to_encoded_point(false);
        let mut expected = [0u8; 65];
        expected.copy_from_slice(point.as_bytes());

        let digest = [0x33; 32];
        let sig: Signature = signer.sign_prehash(&digest).unwrap();
        let (r, s) = split(&sig);
        assert!(matches!(
            resolve_recovery_id(&digest, &r, &s, &expected),
            Err(WalletError::RecoveryFailed(_))
        ));
    }

    #[test]
    fn test_normalize_is_idempotent_on_low_s() {
        let key = SigningKey::from_slice(&[0x09; 32]).unwrap();
        let sig: Signature = key.sign_prehash(&[0x44; 32]).unwrap();
        let (r, s) = split(&sig);
        let (nr, ns) = normalize_signature(r, s).unwrap();
        assert_eq!(nr, r);
        assert_eq!(ns, s);
    }

    #[test]
    fn test_chain_v_mapping() {
        assert_eq!(chain_v(Chain::Eth, 0), Some(27));
        assert_eq!(chain_v(Chain::Eth, 1), Some(28));
        assert_eq!(chain_v(Chain::Trx, 0), Some(0));
        assert_eq!(chain_v(Chain::Trx, 1), Some(1));
        assert_eq!(chain_v(Chain::Btc, 1), None);
    }
}
