//! Chain address derivation from uncompressed secp256k1 public keys.
//!
//! All three derivers are pure functions over the 65-byte SEC1 point.
//! ETH and TRX share the keccak-last-20 core and differ in presentation;
//! BTC is legacy P2PKH over the compressed key.

use sha3::{Digest, Keccak256};

use bitcoin::hashes::{hash160, Hash};

use crate::core::domain::Chain;
use crate::core::errors::WalletError;
use crate::crypto::codec;

const BTC_P2PKH_VERSION: u8 = 0x00;
const TRX_ADDRESS_VERSION: u8 = 0x41;

/// Derive the address for `chain` from an uncompressed public key.
pub fn derive_address(chain: Chain, uncompressed: &[u8; 65]) -> Result<String, WalletError> {
    match chain {
        Chain::Eth => ethereum_address(uncompressed),
        Chain::Btc => bitcoin_p2pkh_address(uncompressed),
        Chain::Trx => tron_address(uncompressed),
    }
}

/// Last 20 bytes of keccak256 over the 64-byte point body (prefix dropped),
/// lowercase hex with a 0x prefix.
pub fn ethereum_address(uncompressed: &[u8; 65]) -> Result<String, WalletError> {
    let hash = keccak_point_body(uncompressed)?;
    Ok(format!("0x{}", hex::encode(&hash[12..])))
}

/// Legacy P2PKH: hash160 of the compressed key, version byte 0x00,
/// Base58Check.
pub fn bitcoin_p2pkh_address(uncompressed: &[u8; 65]) -> Result<String, WalletError> {
    let compressed = codec::compress_point(uncompressed)?;
    let h = hash160::Hash::hash(&compressed);
    let mut payload = Vec::with_capacity(21);
    payload.push(BTC_P2PKH_VERSION);
    payload.extend_from_slice(&h.to_byte_array());
    Ok(codec::base58check_encode(&payload))
}

/// Same 20-byte core as Ethereum, version byte 0x41, Base58Check.
pub fn tron_address(uncompressed: &[u8; 65]) -> Result<String, WalletError> {
    let hash = keccak_point_body(uncompressed)?;
    let mut payload = Vec::with_capacity(21);
    payload.push(TRX_ADDRESS_VERSION);
    payload.extend_from_slice(&hash[12..]);
    Ok(codec::base58check_encode(&payload))
}

/// The 20-byte EVM-style account id backing a base58 Tron address.
pub fn tron_address_to_evm_bytes(address: &str) -> Result<[u8; 20], WalletError> {
    let payload = codec::base58check_decode(address)?;
    if payload.len() != 21 || payload[0] != TRX_ADDRESS_VERSION {
        return Err(WalletError::ValidationError(format!(
            "not a Tron address: {}",
            address
        )));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&payload[1..]);
    Ok(out)
}

fn keccak_point_body(uncompressed: &[u8; 65]) -> Result<[u8; 32], WalletError> {
    if uncompressed[0] != 0x04 {
        return Err(WalletError::InvalidPoint(format!(
            "prefix 0x{:02x}, want 0x04",
            uncompressed[0]
        )));
    }
    let digest = Keccak256::digest(&uncompressed[1..]);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(out)
}
