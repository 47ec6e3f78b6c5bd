//! Address discovery over HD indices.
//!
//! The walk is sequential: whether index `n + 1` is probed depends on the
//! history of index `n`. Any [`HistorySource`] can drive it.

use tracing::{debug, info};

use crate::blockchain::traits::HistorySource;
use crate::core::derivation::{derive_at_index, validate_mnemonic, WalletHandle};
use crate::core::errors::WalletError;

/// Walk indices from `start` until one has no history.
///
/// Returns `0` when the first probed index is `0` and empty, otherwise the
/// empty index plus one.
pub async fn find_next_unused_index<H>(
    source: &H,
    phrase: &str,
    start: u32,
) -> Result<u32, WalletError>
where
    H: HistorySource + ?Sized,
{
    let phrase = validate_mnemonic(phrase)?;
    let mut index = start;

    loop {
        let handle = derive_at_index(&phrase, index)?;
        let page = source.fetch_history(&handle.address(), None).await?;
        if page.records.is_empty() {
            break;
        }
        debug!(index, address = %handle.address(), records = page.records.len(), "Address in use");
        index = index
            .checked_add(1)
            .ok_or_else(|| WalletError::KeyDerivation("Address index overflow".to_string()))?;
    }

    let next = if index == 0 {
        0
    } else {
        index
            .checked_add(1)
            .ok_or_else(|| WalletError::KeyDerivation("Address index overflow".to_string()))?
    };
    info!(start, first_empty = index, next, "Address discovery finished");
    Ok(next)
}

/// Derive every address from index 0 through `max(unused_index - 1, 0)`.
/// History is not re-checked.
pub fn collect_used_addresses(
    phrase: &str,
    unused_index: u32,
) -> Result<Vec<WalletHandle>, WalletError> {
    let phrase = validate_mnemonic(phrase)?;
    let last = unused_index.saturating_sub(1);
    (0..=last).map(|i| derive_at_index(&phrase, i)).collect()
}

/// Addresses to import for `phrase`. A known boundary skips the walk.
pub async fn import_all_active_addresses<H>(
    source: &H,
    phrase: &str,
    index: Option<u32>,
) -> Result<Vec<WalletHandle>, WalletError>
where
    H: HistorySource + ?Sized,
{
    let boundary = match index {
        Some(i) => i,
        None => find_next_unused_index(source, phrase, 0).await?,
    };
    collect_used_addresses(phrase, boundary)
}
