use super::codec::{encode_address, parse_address, parse_bigint, parse_decimal};
use crate::entities::Token;
use crate::error::IndexerResult;
use rusqlite::{OptionalExtension, params};

pub struct TokenRepository<'a> {
    conn: &'a rusqlite::Connection,
}

type TokenRow = (String, String, String, u8, String, String, String, String);

impl<'a> TokenRepository<'a> {
    const UPSERT_TOKEN: &'static str = "INSERT OR REPLACE INTO tokens (
            id, name, symbol, decimals, address,
            total_supply, max_supply, holders_count
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

    const SELECT_TOKEN: &'static str = "SELECT id, name, symbol, decimals, address,
            total_supply, max_supply, holders_count
        FROM tokens WHERE id = ?1";

    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn load(&self, id: &str) -> IndexerResult<Option<Token>> {
        let row: Option<TokenRow> = self
            .conn
            .query_row(Self::SELECT_TOKEN, params![id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ))
            })
            .optional()?;

        row.map(Self::row_to_token).transpose()
    }

    pub fn save(&self, token: &Token) -> IndexerResult<()> {
        self.conn.execute(
            Self::UPSERT_TOKEN,
            params![
                token.id,
                token.name,
                token.symbol,
                token.decimals,
                encode_address(&token.address),
                token.total_supply.to_string(),
                token.max_supply.to_string(),
                token.holders_count.to_string(),
            ],
        )?;
        Ok(())
    }

    fn row_to_token(row: TokenRow) -> IndexerResult<Token> {
        let (id, name, symbol, decimals, address, total_supply, max_supply, holders_count) = row;
        Ok(Token {
            id,
            name,
            symbol,
            decimals,
            address: parse_address("address", &address)?,
            total_supply: parse_decimal("total_supply", &total_supply)?,
            max_supply: parse_bigint("max_supply", &max_supply)?,
            holders_count: parse_bigint("holders_count", &holders_count)?,
        })
    }
}
