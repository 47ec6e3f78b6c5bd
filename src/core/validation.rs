use ethers::types::Address;
use ethers::utils::to_checksum;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

use crate::core::errors::WalletError;

static HEX_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("Hardcoded regex should always compile"));

static TX_HASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").expect("Hardcoded regex should always compile"));

/// Validates an Ethereum address.
///
/// All-lower and all-upper hex bodies are accepted; mixed case must carry a
/// valid EIP-55 checksum.
pub fn validate_ethereum_address(address: &str) -> Result<(), WalletError> {
    if !HEX_ADDRESS.is_match(address) {
        return Err(WalletError::InvalidAddress("Invalid Ethereum address".to_string()));
    }
    let body = &address[2..];
    let is_all_lower = body.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = body.chars().all(|c| !c.is_ascii_lowercase());
    if is_all_lower || is_all_upper {
        return Ok(());
    }
    if !is_eip55_checksum_valid(address) {
        return Err(WalletError::InvalidAddress(
            "Invalid EIP-55 checksum for Ethereum address".to_string(),
        ));
    }
    Ok(())
}

/// Boolean form of [`validate_ethereum_address`].
pub fn is_valid_address(address: &str) -> bool {
    validate_ethereum_address(address).is_ok()
}

pub fn is_valid_tx_hash(hash: &str) -> bool {
    TX_HASH.is_match(hash)
}

fn is_eip55_checksum_valid(addr: &str) -> bool {
    Address::from_str(addr).map(|a| to_checksum(&a, None) == addr).unwrap_or(false)
}
