use super::codec::{encode_address, parse_decimal, parse_optional_address, parse_optional_u128};
use crate::entities::Transfer;
use crate::error::IndexerResult;
use rusqlite::{OptionalExtension, Row, params};

pub struct TransferRepository<'a> {
    conn: &'a rusqlite::Connection,
}

struct TransferRow {
    id: String,
    from_address: Option<String>,
    to_address: Option<String>,
    value: String,
    timestamp: u64,
    block_number: u64,
    gas_price: Option<String>,
    gas_used: Option<u64>,
}

impl<'a> TransferRepository<'a> {
    const UPSERT_TRANSFER: &'static str = "INSERT OR REPLACE INTO transfers (
            id, from_address, to_address, value,
            timestamp, block_number, gas_price, gas_used
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

    const SELECT_TRANSFER: &'static str = "SELECT id, from_address, to_address, value,
            timestamp, block_number, gas_price, gas_used
        FROM transfers WHERE id = ?1";

    const COUNT_TRANSFERS: &'static str = "SELECT COUNT(*) FROM transfers";

    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn load(&self, id: &str) -> IndexerResult<Option<Transfer>> {
        let row = self
            .conn
            .query_row(Self::SELECT_TRANSFER, params![id], Self::read_row)
            .optional()?;

        row.map(Self::row_to_transfer).transpose()
    }

    pub fn save(&self, transfer: &Transfer) -> IndexerResult<()> {
        self.conn.execute(
            Self::UPSERT_TRANSFER,
            params![
                transfer.id,
                transfer.from.as_ref().map(encode_address),
                transfer.to.as_ref().map(encode_address),
                transfer.value.to_string(),
                transfer.timestamp,
                transfer.block_number,
                transfer.gas_price.map(|price| price.to_string()),
                transfer.gas_used,
            ],
        )?;
        Ok(())
    }

    pub fn count(&self) -> IndexerResult<usize> {
        let count: usize = self
            .conn
            .query_row(Self::COUNT_TRANSFERS, [], |row| row.get(0))?;
        Ok(count)
    }

    fn read_row(row: &Row) -> rusqlite::Result<TransferRow> {
        Ok(TransferRow {
            id: row.get(0)?,
            from_address: row.get(1)?,
            to_address: row.get(2)?,
            value: row.get(3)?,
            timestamp: row.get(4)?,
            block_number: row.get(5)?,
            gas_price: row.get(6)?,
            gas_used: row.get(7)?,
        })
    }

    fn row_to_transfer(row: TransferRow) -> IndexerResult<Transfer> {
        Ok(Transfer {
            id: row.id,
            from: parse_optional_address("from_address", row.from_address)?,
            to: parse_optional_address("to_address", row.to_address)?,
            value: parse_decimal("value", &row.value)?,
            timestamp: row.timestamp,
            block_number: row.block_number,
            gas_price: parse_optional_u128("gas_price", row.gas_price)?,
            gas_used: row.gas_used,
        })
    }
}
