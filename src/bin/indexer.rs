use anyhow::Result;
use clap::Parser;
use keep_indexer::config::Config;
use keep_indexer::deployment::verify_token_metadata;
use keep_indexer::repository::Database;
use keep_indexer::rpc::RpcClient;
use keep_indexer::scanner::Scanner;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Index KEEP token transfers into SQLite", long_about = None)]
struct Cli {
    /// Block to start from when the database has no cursor yet
    #[arg(long)]
    start_block: Option<u64>,

    /// Blocks fetched per log request
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: Option<u64>,

    /// Exit once the chain head is reached instead of polling
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    info!("Starting KEEP token indexer");

    let mut config = Config::from_env()?;
    if let Some(block) = cli.start_block {
        config.start_block = Some(block);
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    info!("Configuration loaded");
    info!("Contract address: {:?}", config.token_contract_address);
    info!(
        "RPC URLs: {} endpoint(s) configured",
        config.json_rpc_urls.len()
    );

    let db = Database::new(&config.database_url)?;
    info!("Database initialized");

    let client = RpcClient::new(&config.json_rpc_urls)?;
    info!("RPC client connected");

    verify_token_metadata(&client, config.token_contract_address).await?;

    let mut scanner = Scanner::new(client, db, &config);

    if let Err(e) = scanner.run(cli.once).await {
        error!("Scanner error: {:#}", e);
        return Err(e);
    }

    Ok(())
}
