use crate::error::{IndexerError, IndexerResult};
use crate::events::{EventContext, IKeepToken};
use crate::projector::SupplySource;
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log, TransactionRequest};
use alloy::sol_types::SolCall;
use alloy_primitives::{Address, B256, Bytes, U256};
use anyhow::Result;
use regex::Regex;
use std::future::IntoFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

type AlloyFullProvider = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider,
>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120); // 2 minutes timeout per request
const MAX_RESULTS_ERROR: &str = "exceeds max results";

#[derive(Clone)]
pub struct RpcClient {
    providers: Vec<AlloyFullProvider>,
    urls: Vec<String>,
    current_provider: Arc<AtomicUsize>,
    max_retries: usize,
}

impl RpcClient {
    pub fn new(rpc_urls: &[String]) -> Result<Self> {
        if rpc_urls.is_empty() {
            return Err(anyhow::anyhow!("At least one RPC URL must be provided"));
        }

        let mut providers = Vec::new();
        for url in rpc_urls {
            let parsed_url = url
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid RPC URL: {}", url))?;
            let provider: AlloyFullProvider = ProviderBuilder::new().connect_http(parsed_url);
            providers.push(provider);
        }

        Ok(RpcClient {
            providers,
            urls: rpc_urls.to_vec(),
            current_provider: Arc::new(AtomicUsize::new(0)),
            max_retries: 5,
        })
    }

    fn get_provider(&self) -> &AlloyFullProvider {
        let index = self.current_provider.load(Ordering::Relaxed) % self.providers.len();
        &self.providers[index]
    }

    pub fn get_current_url(&self) -> &str {
        let index = self.current_provider.load(Ordering::Relaxed) % self.urls.len();
        &self.urls[index]
    }

    pub fn rotate_provider(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.providers.len();
        self.current_provider.store(next, Ordering::Relaxed);

        if self.providers.len() > 1 {
            debug!("Rotating to RPC provider #{}", next);
        }
    }

    fn get_retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(100)
            .factor(2)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.max_retries)
    }

    fn handle_error(&self, error_str: &str) {
        let current_url = self.get_current_url();
        warn!(
            "RPC error on {}: {}, rotating provider",
            current_url, error_str
        );
        self.rotate_provider();
    }

    fn handle_timeout(&self) -> anyhow::Error {
        let current_url = self.get_current_url();
        warn!(
            "Request timeout after {} seconds on {}, rotating provider",
            REQUEST_TIMEOUT.as_secs(),
            current_url
        );
        self.rotate_provider();
        anyhow::anyhow!(
            "Request timeout after {} seconds",
            REQUEST_TIMEOUT.as_secs()
        )
    }

    /// Run one provider request with timeout, retries and endpoint rotation.
    ///
    /// `make` receives the endpoint current at each attempt.
    async fn request<T, E, F, Fut>(&self, make: F) -> Result<T>
    where
        F: Fn(AlloyFullProvider) -> Fut,
        Fut: IntoFuture<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let make = &make;
        Retry::spawn(self.get_retry_strategy(), move || async move {
            let provider = self.get_provider().clone();
            match timeout(REQUEST_TIMEOUT, make(provider)).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    self.handle_error(&e.to_string());
                    Err(anyhow::anyhow!("{}", e))
                }
                Err(_) => Err(self.handle_timeout()),
            }
        })
        .await
    }

    pub async fn get_latest_block(&self) -> Result<u64> {
        self.request(|provider| async move { provider.get_block_number().await })
            .await
    }

    pub async fn get_code_at_block(&self, address: Address, block_number: u64) -> Result<Bytes> {
        self.request(move |provider| async move {
            provider
                .get_code_at(address)
                .block_id(BlockNumberOrTag::Number(block_number).into())
                .await
        })
        .await
    }

    /// `eth_call` against the latest block, decoding the return data as `C`'s outputs.
    pub async fn call_contract<C: SolCall>(&self, address: Address, call: C) -> Result<C::Return> {
        let input = Bytes::from(call.abi_encode());
        let output = self
            .request(|provider| {
                let request = TransactionRequest::default()
                    .to(address)
                    .input(input.clone().into());
                async move { provider.call(request).await }
            })
            .await?;

        C::abi_decode_returns(&output)
            .map_err(|e| anyhow::anyhow!("Failed to decode {} output: {}", C::SIGNATURE, e))
    }

    pub async fn get_block_timestamp(&self, block_number: u64) -> Result<u64> {
        let block = self
            .request(move |provider| async move {
                provider
                    .get_block_by_number(BlockNumberOrTag::Number(block_number))
                    .await
            })
            .await?;

        block
            .map(|block| block.header.timestamp)
            .ok_or_else(|| anyhow::anyhow!("Block {} not found", block_number))
    }

    /// Sender, recipient and gas figures of a mined transaction, from its receipt.
    pub async fn get_transaction_context(
        &self,
        transaction_hash: B256,
        block_number: u64,
        block_timestamp: u64,
    ) -> Result<EventContext> {
        let receipt = self
            .request(move |provider| async move {
                provider.get_transaction_receipt(transaction_hash).await
            })
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("Receipt for transaction {:?} not found", transaction_hash)
            })?;

        Ok(EventContext {
            block_number,
            block_timestamp,
            transaction_from: receipt.from,
            transaction_to: receipt.to,
            gas_price: receipt.effective_gas_price,
            gas_used: receipt.gas_used,
        })
    }

    /// One `eth_getLogs` call. The inner `Err` carries a provider's
    /// "exceeds max results" message, which is not retried.
    async fn fetch_logs(
        &self,
        from_block: u64,
        to_block: u64,
        contract_address: Address,
        topics: &[B256],
    ) -> Result<std::result::Result<Vec<Log>, String>> {
        let filter = Filter::new()
            .address(contract_address)
            .event_signature(topics.to_vec())
            .from_block(from_block)
            .to_block(to_block);
        let filter = &filter;

        Retry::spawn(self.get_retry_strategy(), move || async move {
            match timeout(REQUEST_TIMEOUT, self.get_provider().get_logs(filter)).await {
                Ok(Ok(logs)) => Ok(Ok(logs)),
                Ok(Err(e)) if e.to_string().contains(MAX_RESULTS_ERROR) => {
                    debug!(
                        "Max results exceeded for blocks {}-{}, will split range",
                        from_block, to_block
                    );
                    Ok(Err(e.to_string()))
                }
                Ok(Err(e)) => {
                    self.handle_error(&e.to_string());
                    Err(anyhow::anyhow!("{}", e))
                }
                Err(_) => Err(self.handle_timeout()),
            }
        })
        .await
    }

    fn parse_max_results_error(error_str: &str) -> Option<(u64, u64)> {
        let re = Regex::new(r"retry with the range (\d+)-(\d+)").ok()?;
        let captures = re.captures(error_str)?;

        let from = captures.get(1)?.as_str().parse().ok()?;
        let to = captures.get(2)?.as_str().parse().ok()?;

        Some((from, to))
    }

    /// Logs of `contract_address` matching any of `topics` in `[from_block, to_block]`.
    ///
    /// When the provider caps the result size, the range it suggests is
    /// fetched first and the remainder requested again.
    pub async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        contract_address: Address,
        topics: &[B256],
    ) -> Result<Vec<Log>> {
        let mut all_logs = Vec::new();
        let mut current_from = from_block;

        while current_from <= to_block {
            let too_many = match self
                .fetch_logs(current_from, to_block, contract_address, topics)
                .await?
            {
                Ok(logs) => {
                    all_logs.extend(logs);
                    break;
                }
                Err(message) => message,
            };

            let (suggested_from, suggested_to) = Self::parse_max_results_error(&too_many)
                .filter(|(from, to)| *from == current_from && *to >= *from && *to < to_block)
                .ok_or_else(|| anyhow::anyhow!("{}", too_many))?;

            info!(
                "Hit max results limit for blocks {}-{}, splitting at block {}",
                current_from, to_block, suggested_to
            );

            let logs = self
                .fetch_logs(suggested_from, suggested_to, contract_address, topics)
                .await?
                .map_err(|message| anyhow::anyhow!("{}", message))?;

            all_logs.extend(logs);
            current_from = suggested_to + 1;
        }

        Ok(all_logs)
    }
}

impl SupplySource for RpcClient {
    async fn total_supply(&self, token: Address) -> IndexerResult<U256> {
        self.call_contract(token, IKeepToken::totalSupplyCall {})
            .await
            .map_err(|e| IndexerError::Contract(format!("totalSupply(): {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_max_results_error() {
        let error = "query exceeds max results 10000, retry with the range 11565019-11566308";
        assert_eq!(
            RpcClient::parse_max_results_error(error),
            Some((11_565_019, 11_566_308))
        );
        assert_eq!(RpcClient::parse_max_results_error("timeout"), None);
    }

    #[test]
    fn test_new_requires_an_endpoint() {
        assert!(RpcClient::new(&[]).is_err());
        assert!(RpcClient::new(&["not a url".to_string()]).is_err());
    }

    #[test]
    fn test_rotate_provider_cycles_endpoints() {
        let urls = vec![
            "http://localhost:8545".to_string(),
            "http://localhost:8546".to_string(),
        ];
        let client = RpcClient::new(&urls).unwrap();
        assert_eq!(client.get_current_url(), "http://localhost:8545");
        client.rotate_provider();
        assert_eq!(client.get_current_url(), "http://localhost:8546");
        client.rotate_provider();
        assert_eq!(client.get_current_url(), "http://localhost:8545");
    }
}
