use super::codec::{parse_bigint, parse_decimal};
use crate::entities::Holder;
use crate::error::IndexerResult;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use rusqlite::{Connection, OptionalExtension, params};

pub struct HolderRepository<'a> {
    conn: &'a Connection,
}

type HolderRow = (String, String, String, Option<String>);

impl<'a> HolderRepository<'a> {
    const UPSERT_HOLDER: &'static str =
        "INSERT OR REPLACE INTO holders (id, balance_raw, balance, token) VALUES (?1, ?2, ?3, ?4)";

    const SELECT_HOLDER: &'static str =
        "SELECT id, balance_raw, balance, token FROM holders WHERE id = ?1";

    const SELECT_ALL_HOLDERS: &'static str =
        "SELECT id, balance_raw, balance, token FROM holders ORDER BY id";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn load(&self, id: &str) -> IndexerResult<Option<Holder>> {
        let row: Option<HolderRow> = self
            .conn
            .query_row(Self::SELECT_HOLDER, params![id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .optional()?;

        row.map(Self::row_to_holder).transpose()
    }

    pub fn save(&self, holder: &Holder) -> IndexerResult<()> {
        self.conn.execute(
            Self::UPSERT_HOLDER,
            params![
                holder.id,
                holder.balance_raw.to_string(),
                holder.balance.to_string(),
                holder.token,
            ],
        )?;
        Ok(())
    }

    /// Every holder record, zero and negative balances included.
    pub fn load_all(&self) -> IndexerResult<Vec<Holder>> {
        let mut stmt = self.conn.prepare(Self::SELECT_ALL_HOLDERS)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<Result<Vec<HolderRow>, _>>()?;

        rows.into_iter().map(Self::row_to_holder).collect()
    }

    /// Number of holders with a strictly positive raw balance.
    ///
    /// Balances are stored as text, so the comparison happens here rather than in SQL.
    pub fn count_positive(&self) -> IndexerResult<usize> {
        Ok(self
            .load_all()?
            .iter()
            .filter(|holder| holder.balance_raw.is_positive())
            .count())
    }

    pub fn sum_balance_raw(&self) -> IndexerResult<BigInt> {
        Ok(self
            .load_all()?
            .into_iter()
            .fold(BigInt::zero(), |acc, holder| acc + holder.balance_raw))
    }

    fn row_to_holder(row: HolderRow) -> IndexerResult<Holder> {
        let (id, balance_raw, balance, token) = row;
        Ok(Holder {
            id,
            balance_raw: parse_bigint("balance_raw", &balance_raw)?,
            balance: parse_decimal("balance", &balance)?,
            token,
        })
    }
}
