use super::codec::encode_address;
use alloy_primitives::Address;
use anyhow::Result;
use rusqlite::{OptionalExtension, params};

/// Scan cursor for one contract.
pub struct SyncStateRepository<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> SyncStateRepository<'a> {
    const INSERT_SYNC_STATE: &'static str =
        "INSERT OR IGNORE INTO sync_state (contract_address, start_block, last_processed_block)
         VALUES (?1, ?2, NULL)";

    const UPDATE_LAST_PROCESSED_BLOCK: &'static str =
        "UPDATE sync_state SET last_processed_block = ?1 WHERE contract_address = ?2";

    const GET_START_BLOCK: &'static str =
        "SELECT start_block FROM sync_state WHERE contract_address = ?1";

    const GET_LAST_PROCESSED_BLOCK: &'static str =
        "SELECT last_processed_block FROM sync_state WHERE contract_address = ?1";

    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, address: &Address, start_block: u64) -> Result<()> {
        self.conn.execute(
            Self::INSERT_SYNC_STATE,
            params![encode_address(address), start_block],
        )?;
        Ok(())
    }

    pub fn get_start_block(&self, address: &Address) -> Result<Option<u64>> {
        let block: Option<u64> = self
            .conn
            .query_row(
                Self::GET_START_BLOCK,
                params![encode_address(address)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(block)
    }

    /// `None` until the first batch for this contract has been committed.
    pub fn get_last_processed_block(&self, address: &Address) -> Result<Option<u64>> {
        let block: Option<Option<u64>> = self
            .conn
            .query_row(
                Self::GET_LAST_PROCESSED_BLOCK,
                params![encode_address(address)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(block.flatten())
    }

    pub fn update_last_processed_block(&self, address: &Address, block_number: u64) -> Result<()> {
        self.conn.execute(
            Self::UPDATE_LAST_PROCESSED_BLOCK,
            params![block_number, encode_address(address)],
        )?;
        Ok(())
    }
}
