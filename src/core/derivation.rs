//! BIP-39 / BIP-44 key material for Ethereum accounts.
//!
//! Every account lives at `m/44'/60'/0'/0/{index}`. Mnemonic validation is
//! done with `bip39`; the HD math and secp256k1 keys come from the `ethers`
//! signer stack. Private key bytes are held in zeroizing buffers and never
//! logged.

use bip39::Mnemonic;
use ethers::signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer};
use ethers::types::Address;
use ethers::utils::to_checksum;
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::core::errors::WalletError;
use crate::security::{vec_to_secret, SecretVec};

/// Ethereum BIP-44 prefix; the address index is appended.
pub const ETHEREUM_PATH_PREFIX: &str = "m/44'/60'/0'/0";

/// Entropy for a freshly generated 12-word phrase.
const ENTROPY_BYTES: usize = 16;

/// Derivation path for `index` under the Ethereum BIP-44 prefix.
pub fn derivation_path(index: u32) -> String {
    format!("{}/{}", ETHEREUM_PATH_PREFIX, index)
}

/// Key material derived at one HD path.
pub struct WalletHandle {
    address: Address,
    private_key: SecretVec,
    derivation_path: String,
    index: u32,
    phrase: Option<Zeroizing<String>>,
}

impl WalletHandle {
    /// EIP-55 checksummed address.
    pub fn address(&self) -> String {
        to_checksum(&self.address, None)
    }

    pub fn raw_address(&self) -> Address {
        self.address
    }

    /// Raw 32-byte secp256k1 secret.
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// 0x-prefixed hex of the private key, zeroized on drop.
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(&*self.private_key)))
    }

    pub fn derivation_path(&self) -> &str {
        &self.derivation_path
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Mnemonic the handle was created or restored from, if it was kept.
    pub fn phrase(&self) -> Option<&str> {
        self.phrase.as_ref().map(|p| p.as_str())
    }
}

impl fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletHandle")
            .field("address", &self.address())
            .field("derivation_path", &self.derivation_path)
            .field("private_key", &"<redacted>")
            .field("phrase", &self.phrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Generate a new 12-word phrase from OS entropy and derive index 0.
pub fn create_random() -> Result<WalletHandle, WalletError> {
    let mut entropy = Zeroizing::new([0u8; ENTROPY_BYTES]);
    OsRng
        .try_fill_bytes(&mut entropy[..])
        .map_err(|e| WalletError::EntropyUnavailable(e.to_string()))?;
    let mnemonic = Mnemonic::from_entropy(&entropy[..])
        .map_err(|e| WalletError::KeyDerivation(format!("Failed to create wallet: {}", e)))?;
    let phrase = Zeroizing::new(mnemonic.to_string());

    let mut handle = derive_validated(&phrase, 0)?;
    handle.phrase = Some(phrase);
    info!(address = %handle.address(), "Created random wallet");
    Ok(handle)
}

/// Restore the default account (index 0) from a phrase, keeping the phrase.
pub fn restore_from_phrase(phrase: &str) -> Result<WalletHandle, WalletError> {
    let normalized = validate_mnemonic(phrase)?;
    let mut handle = derive_validated(&normalized, 0)?;
    handle.phrase = Some(normalized);
    Ok(handle)
}

/// Derive the account at `index`.
pub fn derive_at_index(phrase: &str, index: u32) -> Result<WalletHandle, WalletError> {
    let normalized = validate_mnemonic(phrase)?;
    derive_validated(&normalized, index)
}

/// Derive only the private key at an arbitrary derivation path.
pub fn derive_private_key(phrase: &str, path: &str) -> Result<SecretVec, WalletError> {
    let normalized = validate_mnemonic(phrase)?;
    let wallet = build_wallet(&normalized, path)?;
    Ok(vec_to_secret(wallet.signer().to_bytes().to_vec()))
}

/// Check that `phrase` is non-empty and passes the BIP-39 checksum. Returns
/// the normalized (single-spaced) phrase.
pub fn validate_mnemonic(phrase: &str) -> Result<Zeroizing<String>, WalletError> {
    if phrase.trim().is_empty() {
        return Err(WalletError::InvalidMnemonic("Mnemonic phrase cannot be empty".to_string()));
    }
    let mnemonic = Mnemonic::parse(phrase)
        .map_err(|e| WalletError::InvalidMnemonic(format!("Invalid mnemonic phrase: {}", e)))?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}

fn derive_validated(phrase: &str, index: u32) -> Result<WalletHandle, WalletError> {
    let path = derivation_path(index);
    debug!(path = %path, "Deriving wallet");
    let wallet = build_wallet(phrase, &path)?;

    Ok(WalletHandle {
        address: wallet.address(),
        private_key: vec_to_secret(wallet.signer().to_bytes().to_vec()),
        derivation_path: path,
        index,
        phrase: None,
    })
}

fn build_wallet(phrase: &str, path: &str) -> Result<LocalWallet, WalletError> {
    MnemonicBuilder::<English>::default()
        .phrase(phrase)
        .derivation_path(path)
        .map_err(|e| WalletError::KeyDerivation(format!("Failed to set derivation path: {}", e)))?
        .build()
        .map_err(|e| WalletError::KeyDerivation(format!("Failed to build wallet: {}", e)))
}
