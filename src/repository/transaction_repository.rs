use super::codec::{encode_address, parse_optional_address};
use crate::entities::Transaction;
use crate::error::IndexerResult;
use rusqlite::{OptionalExtension, params};

pub struct TransactionRepository<'a> {
    conn: &'a rusqlite::Connection,
}

type TransactionRow = (String, Option<String>, Option<String>, u64, u64);

impl<'a> TransactionRepository<'a> {
    const UPSERT_TRANSACTION: &'static str = "INSERT OR REPLACE INTO transactions (
            id, from_address, to_address, timestamp, block_number
        ) VALUES (?1, ?2, ?3, ?4, ?5)";

    const SELECT_TRANSACTION: &'static str =
        "SELECT id, from_address, to_address, timestamp, block_number
         FROM transactions WHERE id = ?1";

    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn load(&self, id: &str) -> IndexerResult<Option<Transaction>> {
        let row: Option<TransactionRow> = self
            .conn
            .query_row(Self::SELECT_TRANSACTION, params![id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })
            .optional()?;

        row.map(|(id, from, to, timestamp, block_number)| {
            Ok(Transaction {
                id,
                from: parse_optional_address("from_address", from)?,
                to: parse_optional_address("to_address", to)?,
                timestamp,
                block_number,
            })
        })
        .transpose()
    }

    pub fn save(&self, transaction: &Transaction) -> IndexerResult<()> {
        self.conn.execute(
            Self::UPSERT_TRANSACTION,
            params![
                transaction.id,
                transaction.from.as_ref().map(encode_address),
                transaction.to.as_ref().map(encode_address),
                transaction.timestamp,
                transaction.block_number,
            ],
        )?;
        Ok(())
    }
}
