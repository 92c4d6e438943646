use anyhow::Result;
use keep_indexer::config::DEFAULT_DATABASE_URL;
use keep_indexer::repository::Database;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    dotenv::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    info!("Creating schema in database: {}", database_url);

    let _db = Database::new(&database_url)?;

    info!("Schema ready");

    Ok(())
}
