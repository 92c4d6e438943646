use anyhow::{Context, Result};
use rusqlite::Connection;

pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn new(db_path: &str) -> Result<Self> {
        let db_path = db_path.strip_prefix("sqlite:").unwrap_or(db_path);
        let conn = Connection::open(db_path).context("Failed to open database")?;

        let db = Database { conn };
        db.create_tables()?;
        Ok(db)
    }

    /// Fresh schema in a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn create_tables(&self) -> Result<()> {
        // Singleton token aggregate
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tokens (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                symbol TEXT NOT NULL,
                decimals INTEGER NOT NULL,
                address TEXT NOT NULL,
                total_supply TEXT NOT NULL,
                max_supply TEXT NOT NULL,
                holders_count TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS holders (
                id TEXT PRIMARY KEY,
                balance_raw TEXT NOT NULL,
                balance TEXT NOT NULL,
                token TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS transfers (
                id TEXT PRIMARY KEY,
                from_address TEXT,
                to_address TEXT,
                value TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                block_number INTEGER NOT NULL,
                gas_price TEXT,
                gas_used INTEGER
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                from_address TEXT,
                to_address TEXT,
                timestamp INTEGER NOT NULL,
                block_number INTEGER NOT NULL
            )",
            [],
        )?;

        // Scan cursor, one row per indexed contract
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS sync_state (
                contract_address TEXT PRIMARY KEY,
                start_block INTEGER NOT NULL,
                last_processed_block INTEGER
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_transfers_block_number
             ON transfers(block_number)",
            [],
        )?;

        Ok(())
    }
}
