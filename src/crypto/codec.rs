//! Binary codecs for KMS-facing key and signature material.
//!
//! Cloud KMS backends hand back DER: a SubjectPublicKeyInfo for public keys
//! and an ASN.1 SEQUENCE of two INTEGERs for ECDSA signatures. Chain code
//! wants raw SEC1 points and fixed-width scalars, so the translation lives
//! here, along with Base58Check for the UTXO-style address formats.

use sha2::{Digest, Sha256};

use crate::core::errors::WalletError;

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;

/// DER prefix of a secp256k1 SubjectPublicKeyInfo with an uncompressed
/// point payload: SEQUENCE { SEQUENCE { id-ecPublicKey, secp256k1 },
/// BIT STRING (0 unused bits) }.
pub const SEC1_SPKI_PREFIX: &[u8] = &[
    0x30, 0x56, 0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x05,
    0x2b, 0x81, 0x04, 0x00, 0x0a, 0x03, 0x42, 0x00,
];

/// Minimal DER reader: tags, short/long-form lengths, bounded slices.
struct DerReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_u8(&mut self) -> Result<u8, String> {
        let b = *self.buf.get(self.pos).ok_or("unexpected end of input")?;
        self.pos += 1;
        Ok(b)
    }

    fn expect_tag(&mut self, tag: u8, what: &str) -> Result<(), String> {
        let got = self.read_u8()?;
        if got != tag {
            return Err(format!("expected {} tag 0x{:02x}, got 0x{:02x}", what, tag, got));
        }
        Ok(())
    }

    /// Definite-form length. Long form is capped at 4 length bytes.
    fn read_len(&mut self) -> Result<usize, String> {
        let first = self.read_u8()?;
        if first & 0x80 == 0 {
            return Ok(first as usize);
        }
        let n = (first & 0x7f) as usize;
        if n == 0 || n > 4 {
            return Err(format!("unsupported length-of-length {}", n));
        }
        let mut len = 0usize;
        for _ in 0..n {
            len = (len << 8) | self.read_u8()? as usize;
        }
        Ok(len)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        if self.remaining() < n {
            return Err(format!("need {} bytes, {} remain", n, self.remaining()));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }
}

/// Extract the 65-byte uncompressed SEC1 point from a DER-encoded
/// SubjectPublicKeyInfo.
pub fn spki_to_uncompressed_point(der: &[u8]) -> Result<[u8; 65], WalletError> {
    parse_spki(der).map_err(WalletError::MalformedKey)
}

fn parse_spki(der: &[u8]) -> Result<[u8; 65], String> {
    let mut r = DerReader::new(der);
    r.expect_tag(TAG_SEQUENCE, "SubjectPublicKeyInfo")?;
    let outer_len = r.read_len()?;
    if outer_len != r.remaining() {
        return Err(format!(
            "outer length {} does not match {} remaining bytes",
            outer_len,
            r.remaining()
        ));
    }

    // AlgorithmIdentifier: contents are irrelevant, only the framing matters.
    r.expect_tag(TAG_SEQUENCE, "AlgorithmIdentifier")?;
    let alg_len = r.read_len()?;
    r.take(alg_len)?;

    r.expect_tag(TAG_BIT_STRING, "subjectPublicKey")?;
    let bits_len = r.read_len()?;
    if bits_len < 2 {
        return Err("BIT STRING too short".to_string());
    }
    let bits = r.take(bits_len)?;
    if bits[0] != 0 {
        return Err(format!("BIT STRING has {} unused bits", bits[0]));
    }
    let payload = &bits[1..];
    if payload.len() != 65 {
        return Err(format!("public key payload is {} bytes, want 65", payload.len()));
    }
    if payload[0] != 0x04 {
        return Err(format!("point prefix 0x{:02x}, want 0x04", payload[0]));
    }
    let mut point = [0u8; 65];
    point.copy_from_slice(payload);
    Ok(point)
}

/// Split a DER-encoded ECDSA signature into fixed-width big-endian (r, s).
///
/// Leading zero bytes of each INTEGER are stripped and the value left-padded
/// to 32 bytes. An integer with more than 32 significant bytes cannot be a
/// secp256k1 scalar.
pub fn der_signature_to_rs(der: &[u8]) -> Result<([u8; 32], [u8; 32]), WalletError> {
    parse_der_signature(der).map_err(WalletError::MalformedSignature)
}

fn parse_der_signature(der: &[u8]) -> Result<([u8; 32], [u8; 32]), String> {
    let mut r = DerReader::new(der);
    r.expect_tag(TAG_SEQUENCE, "ECDSA-Sig-Value")?;
    let total = r.read_len()?;
    if total != r.remaining() {
        return Err(format!(
            "sequence length {} does not match {} remaining bytes",
            total,
            r.remaining()
        ));
    }
    let r_scalar = read_fixed_integer(&mut r)?;
    let s_scalar = read_fixed_integer(&mut r)?;
    if r.remaining() != 0 {
        return Err(format!("{} trailing bytes after s", r.remaining()));
    }
    Ok((r_scalar, s_scalar))
}

fn read_fixed_integer(r: &mut DerReader<'_>) -> Result<[u8; 32], String> {
    r.expect_tag(TAG_INTEGER, "INTEGER")?;
    let len = r.read_len()?;
    if len == 0 {
        return Err("zero-length INTEGER".to_string());
    }
    let mut bytes = r.take(len)?;
    while !bytes.is_empty() && bytes[0] == 0 {
        bytes = &bytes[1..];
    }
    if bytes.len() > 32 {
        return Err(format!("{} significant bytes in scalar, want at most 32", bytes.len()));
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(out)
}

/// Compress an uncompressed SEC1 point: prefix by Y parity, keep X.
pub fn compress_point(point: &[u8; 65]) -> Result<[u8; 33], WalletError> {
    if point[0] != 0x04 {
        return Err(WalletError::InvalidPoint(format!(
            "prefix 0x{:02x}, want 0x04",
            point[0]
        )));
    }
    let mut out = [0u8; 33];
    out[0] = if point[64] & 1 == 0 { 0x02 } else { 0x03 };
    out[1..].copy_from_slice(&point[1..33]);
    Ok(out)
}

/// Base58Check: payload plus 4-byte double-SHA256 checksum, base-58 encoded.
/// Leading zero bytes of the payload come out as leading '1' characters,
/// which is what gives version-0x00 Bitcoin addresses their '1' prefix.
pub fn base58check_encode(payload: &[u8]) -> String {
    let checksum = Sha256::digest(Sha256::digest(payload));
    let mut data = Vec::with_capacity(payload.len() + 4);
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum[..4]);
    bs58::encode(data).into_string()
}

/// Inverse of [`base58check_encode`]: decode and verify the checksum,
/// returning the raw payload.
pub fn base58check_decode(encoded: &str) -> Result<Vec<u8>, WalletError> {
    let data = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| WalletError::ValidationError(format!("base58: {}", e)))?;
    if data.len() < 5 {
        return Err(WalletError::ValidationError(
            "base58check payload too short".to_string(),
        ));
    }
    let (payload, checksum) = data.split_at(data.len() - 4);
    let expected = Sha256::digest(Sha256::digest(payload));
    if checksum != &expected[..4] {
        return Err(WalletError::ValidationError(
            "base58check checksum mismatch".to_string(),
        ));
    }
    Ok(payload.to_vec())
}
