use crate::accessors::get_token;
use crate::config::Config;
use crate::deployment::find_deployment_block;
use crate::dispatch::HandlerTable;
use crate::events::EventContext;
use crate::projector::SupplySource;
use crate::repository::{Database, HolderRepository, SyncStateRepository};
use crate::rpc::RpcClient;
use alloy::rpc::types::Log;
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use num_bigint::BigInt;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{Level, debug, info, warn};

const RATE_LIMIT_DELAY_MS: u64 = 200; // 200ms between requests = 5 requests per second

/// Drives the projection: fetches logs in block order and hands them to the
/// handler table one at a time.
pub struct Scanner {
    client: RpcClient,
    db: Database,
    contract_address: Address,
    handlers: HandlerTable,
    start_block: Option<u64>,
    batch_size: u64,
    poll_interval: Duration,
}

impl Scanner {
    pub fn new(client: RpcClient, db: Database, config: &Config) -> Self {
        Scanner {
            client,
            db,
            contract_address: config.token_contract_address,
            handlers: HandlerTable::token_handlers(),
            start_block: config.start_block,
            batch_size: config.batch_size,
            poll_interval: config.poll_interval,
        }
    }

    /// Scan until the chain head, then keep polling. With `once`, return after catching up.
    pub async fn run(&mut self, once: bool) -> Result<()> {
        let start_block = self.ensure_start_block().await?;

        let mut next_block = resume_block(&self.db, &self.contract_address, start_block)?;

        info!("Starting scan from block {}", next_block);

        loop {
            let loop_start = Instant::now();

            let latest_block = self.client.get_latest_block().await?;

            if next_block > latest_block {
                if once {
                    info!("Caught up to latest block {}", latest_block);
                    return Ok(());
                }
                info!(
                    "Caught up to latest block {}. Entering polling mode...",
                    latest_block
                );
                sleep(self.poll_interval).await;
                continue;
            }

            let to_block = (next_block + self.batch_size - 1).min(latest_block);
            let projected = self.process_range(next_block, to_block).await?;
            info!(
                "Projected {} transfers in blocks {} to {}",
                projected, next_block, to_block
            );
            next_block = to_block + 1;

            // Smart rate limiting: ensure minimum time between loop iterations
            let loop_duration = loop_start.elapsed();
            let target_duration = Duration::from_millis(RATE_LIMIT_DELAY_MS);
            if loop_duration < target_duration {
                sleep(target_duration - loop_duration).await;
            }
        }
    }

    /// Project every log in `[from, to]` and advance the cursor to `to`.
    ///
    /// All writes of the range commit together with the cursor, so an
    /// interrupted range is re-run from its first log and never half-applied.
    pub async fn process_range(&self, from: u64, to: u64) -> Result<usize> {
        let topics = self.handlers.topics();
        info!("Fetching logs for blocks {} to {}", from, to);

        let mut logs = match self
            .client
            .get_logs(from, to, self.contract_address, &topics)
            .await
        {
            Ok(logs) => logs,
            Err(e) if e.to_string().contains("429") => {
                warn!("Rate limited, waiting 1 second before retry...");
                sleep(Duration::from_secs(1)).await;
                self.client
                    .get_logs(from, to, self.contract_address, &topics)
                    .await?
            }
            Err(e) => return Err(e),
        };

        if logs.iter().any(|log| log.removed) {
            warn!("Node returned removed logs for blocks {} to {}, ignoring them", from, to);
            logs.retain(|log| !log.removed);
        }
        info!("Received {} logs for blocks {} to {}", logs.len(), from, to);

        let contexts = self.load_contexts(&logs).await?;

        apply_batch(
            &self.db,
            &self.handlers,
            &self.client,
            self.contract_address,
            &logs,
            &contexts,
            to,
        )
        .await
    }

    /// Block and transaction context for every log whose handler needs it.
    ///
    /// Timestamps are cached per block and receipts per transaction.
    async fn load_contexts(&self, logs: &[Log]) -> Result<Vec<Option<EventContext>>> {
        let mut timestamps: HashMap<u64, u64> = HashMap::new();
        let mut receipts: HashMap<B256, EventContext> = HashMap::new();
        let mut contexts = Vec::with_capacity(logs.len());

        for log in logs {
            let needs_context = self
                .handlers
                .kind_of(log)
                .is_some_and(|kind| kind.needs_context());
            if !needs_context {
                contexts.push(None);
                continue;
            }

            let block_number = log
                .block_number
                .context("Log is missing its block number")?;
            let transaction_hash = log
                .transaction_hash
                .context("Log is missing its transaction hash")?;

            let block_timestamp = match log.block_timestamp.or(timestamps.get(&block_number).copied()) {
                Some(timestamp) => timestamp,
                None => self.client.get_block_timestamp(block_number).await?,
            };
            timestamps.insert(block_number, block_timestamp);

            let ctx = match receipts.get(&transaction_hash) {
                Some(ctx) => ctx.clone(),
                None => {
                    let ctx = self
                        .client
                        .get_transaction_context(transaction_hash, block_number, block_timestamp)
                        .await?;
                    receipts.insert(transaction_hash, ctx.clone());
                    ctx
                }
            };
            contexts.push(Some(ctx));
        }

        Ok(contexts)
    }

    async fn ensure_start_block(&self) -> Result<u64> {
        let sync_repo = SyncStateRepository::new(&self.db.conn);
        if let Some(block) = sync_repo.get_start_block(&self.contract_address)? {
            info!("Using stored start block: {}", block);
            return Ok(block);
        }

        let start_block = match self.start_block {
            Some(block) => {
                info!("Using configured start block: {}", block);
                block
            }
            None => {
                info!(
                    "Finding deployment block for contract {:?}",
                    self.contract_address
                );
                let latest_block = self.client.get_latest_block().await?;
                find_deployment_block(&self.client, self.contract_address, latest_block).await?
            }
        };

        sync_repo.insert(&self.contract_address, start_block)?;
        Ok(start_block)
    }
}

/// First block to scan: one past the stored cursor, or `start_block` when no
/// batch has been committed yet.
pub fn resume_block(db: &Database, contract_address: &Address, start_block: u64) -> Result<u64> {
    Ok(SyncStateRepository::new(&db.conn)
        .get_last_processed_block(contract_address)?
        .map(|block| block + 1)
        .unwrap_or(start_block))
}

/// Dispatch `logs` in chain order and move the cursor to `to_block`, all in
/// one SQLite transaction.
///
/// `contexts[i]` belongs to `logs[i]`. On any error nothing of the batch is
/// kept, cursor included, so the same range can be applied again from its start.
pub async fn apply_batch<Q: SupplySource + ?Sized>(
    db: &Database,
    handlers: &HandlerTable,
    supply: &Q,
    contract_address: Address,
    logs: &[Log],
    contexts: &[Option<EventContext>],
    to_block: u64,
) -> Result<usize> {
    if logs.len() != contexts.len() {
        anyhow::bail!(
            "{} logs but {} contexts in batch ending at block {}",
            logs.len(),
            contexts.len(),
            to_block
        );
    }

    let mut order: Vec<usize> = (0..logs.len()).collect();
    order.sort_by_key(|&i| (logs[i].block_number, logs[i].log_index));

    let tx = db.conn.unchecked_transaction()?;
    let mut projected = 0;

    for i in order {
        let log = &logs[i];
        let outcome = handlers
            .dispatch(log, contexts[i].as_ref(), db, supply)
            .await
            .with_context(|| {
                format!(
                    "Failed to project log {:?} in block {:?}",
                    log.log_index, log.block_number
                )
            })?;

        if let Some(outcome) = outcome {
            debug!(
                key = %outcome.key,
                holders_count = %outcome.holders_count,
                "Transfer projected"
            );
            projected += 1;
        }
    }

    SyncStateRepository::new(&db.conn).update_last_processed_block(&contract_address, to_block)?;
    tx.commit()?;

    if tracing::enabled!(Level::DEBUG) {
        let positive = HolderRepository::new(&db.conn).count_positive()?;
        let token = get_token(db)?;
        if BigInt::from(positive) != token.holders_count {
            debug!(
                holders_count = %token.holders_count,
                positive_balances = positive,
                "Holder count differs from number of positive balances"
            );
        }
    }

    Ok(projected)
}
