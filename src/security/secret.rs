//! Zeroizing buffers for private key material.
use zeroize::Zeroizing;

use crate::core::errors::WalletError;

/// Secret byte buffer, zeroed when dropped.
pub type SecretVec = Zeroizing<Vec<u8>>;

pub fn vec_to_secret(v: Vec<u8>) -> SecretVec {
    Zeroizing::new(v)
}

/// Decode a hex private key (with or without `0x`) into a 32-byte secret.
pub fn private_key_from_hex(key: &str) -> Result<SecretVec, WalletError> {
    let trimmed = key.trim();
    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = vec_to_secret(
        hex::decode(body)
            .map_err(|_| WalletError::InvalidPrivateKey("Private key must be hex".to_string()))?,
    );
    if bytes.len() != 32 {
        return Err(WalletError::InvalidPrivateKey("Private key must be 32 bytes".to_string()));
    }
    Ok(bytes)
}
