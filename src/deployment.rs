use crate::constants::{TOKEN_DECIMALS, TOKEN_NAME, TOKEN_SYMBOL};
use crate::events::IKeepToken;
use crate::rpc::RpcClient;
use alloy_primitives::Address;
use anyhow::Result;
use tracing::{info, warn};

pub async fn find_deployment_block(
    client: &RpcClient,
    address: Address,
    latest_block: u64,
) -> Result<u64> {
    info!("Searching for deployment block of contract {:?}", address);

    let code = client.get_code_at_block(address, latest_block).await?;
    if code.is_empty() {
        anyhow::bail!("Address {:?} is not a deployed contract", address);
    }

    let mut left = 0u64;
    let mut right = latest_block;

    while left < right {
        let mid = (left + right) / 2;

        let code = client.get_code_at_block(address, mid).await?;

        if code.is_empty() {
            left = mid + 1;
        } else {
            right = mid;
        }
    }

    info!("Contract deployed at block {}", left);
    Ok(left)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

impl TokenMetadata {
    /// Human-readable descriptions of every field that disagrees with the
    /// constants the projection is built on. Unreadable fields are not reported.
    pub fn mismatches(&self) -> Vec<String> {
        let mut mismatches = Vec::new();

        if let Some(decimals) = self.decimals.filter(|d| *d != TOKEN_DECIMALS) {
            mismatches.push(format!(
                "decimals() = {decimals}, amounts are scaled by 10^{TOKEN_DECIMALS}"
            ));
        }
        if let Some(name) = self.name.as_deref().filter(|n| *n != TOKEN_NAME) {
            mismatches.push(format!("name() = {name:?}, expected {TOKEN_NAME:?}"));
        }
        if let Some(symbol) = self.symbol.as_deref().filter(|s| *s != TOKEN_SYMBOL) {
            mismatches.push(format!("symbol() = {symbol:?}, expected {TOKEN_SYMBOL:?}"));
        }

        mismatches
    }
}

pub async fn fetch_token_metadata(client: &RpcClient, address: Address) -> Result<TokenMetadata> {
    info!("Fetching token metadata for {:?}", address);

    let name = match client.call_contract(address, IKeepToken::nameCall {}).await {
        Ok(result) => Some(result),
        Err(e) => {
            warn!("Failed to fetch token name: {}", e);
            None
        }
    };

    let symbol = match client.call_contract(address, IKeepToken::symbolCall {}).await {
        Ok(result) => Some(result),
        Err(e) => {
            warn!("Failed to fetch token symbol: {}", e);
            None
        }
    };

    let decimals = match client.call_contract(address, IKeepToken::decimalsCall {}).await {
        Ok(result) => Some(result),
        Err(e) => {
            warn!("Failed to fetch token decimals: {}", e);
            None
        }
    };

    Ok(TokenMetadata {
        name,
        symbol,
        decimals,
    })
}

/// Compare on-chain metadata with the fixed token constants and warn on any drift.
///
/// Never fails the run: amounts keep being scaled by 10^18 either way.
pub async fn verify_token_metadata(client: &RpcClient, address: Address) -> Result<TokenMetadata> {
    let metadata = fetch_token_metadata(client, address).await?;
    let mismatches = metadata.mismatches();

    if mismatches.is_empty() {
        info!("Token metadata matches {} ({})", TOKEN_NAME, TOKEN_SYMBOL);
    }
    for mismatch in &mismatches {
        warn!("Token metadata mismatch: {}", mismatch);
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_metadata_has_no_mismatches() {
        let metadata = TokenMetadata {
            name: Some("KEEP Token".to_string()),
            symbol: Some("KEEP".to_string()),
            decimals: Some(18),
        };
        assert!(metadata.mismatches().is_empty());
        assert!(TokenMetadata::default().mismatches().is_empty());
    }

    #[test]
    fn test_decimals_drift_is_reported() {
        let metadata = TokenMetadata {
            decimals: Some(6),
            ..Default::default()
        };
        let mismatches = metadata.mismatches();
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].contains("decimals() = 6"));
    }
}
