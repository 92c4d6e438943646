use crate::constants::TOKEN_ADDRESS;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./keep-indexer.db";
const DEFAULT_BATCH_SIZE: u64 = 1000; // Most public RPCs allow up to 1k logs per request
const DEFAULT_POLL_INTERVAL_SECS: u64 = 12;

#[derive(Debug, Clone)]
pub struct Config {
    pub json_rpc_urls: Vec<String>,
    pub token_contract_address: Address,
    pub database_url: String,
    /// First block to scan when no cursor is stored; the deployment block is searched otherwise.
    pub start_block: Option<u64>,
    pub batch_size: u64,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let urls = std::env::var("JSON_RPC_URLS")
            .or_else(|_| std::env::var("JSON_RPC_URL"))
            .context("JSON_RPC_URLS (or JSON_RPC_URL) must be set in .env")?;
        let json_rpc_urls = parse_rpc_urls(&urls);
        if json_rpc_urls.is_empty() {
            anyhow::bail!("JSON_RPC_URLS does not contain any URL");
        }

        let token_contract_address = match std::env::var("TOKEN_CONTRACT_ADDRESS") {
            Ok(value) => Address::from_str(value.trim())
                .context("Invalid TOKEN_CONTRACT_ADDRESS format")?,
            Err(_) => TOKEN_ADDRESS,
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let start_block = parse_optional_u64("START_BLOCK")?;
        let batch_size = parse_optional_u64("BATCH_SIZE")?.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            anyhow::bail!("BATCH_SIZE must be greater than zero");
        }
        let poll_interval = Duration::from_secs(
            parse_optional_u64("POLL_INTERVAL_SECS")?.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        );

        Ok(Config {
            json_rpc_urls,
            token_contract_address,
            database_url,
            start_block,
            batch_size,
            poll_interval,
        })
    }
}

/// Split a comma-separated endpoint list, dropping blanks.
pub fn parse_rpc_urls(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from)
        .collect()
}

fn parse_optional_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} must be an unsigned integer")),
        Err(_) => Ok(None),
    }
}
