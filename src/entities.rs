//! Entity records projected from token events.
//!
//! Every entity is keyed by a string id unique within its collection. The
//! `new` constructors give the values an entity has before it was ever
//! persisted; they do not touch the store.

use alloy_primitives::{Address, U256};
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint};

use crate::constants::{
    DEFAULT_MAX_SUPPLY, DEFAULT_TOTAL_SUPPLY, SCALE_EXPONENT, TOKEN_ADDRESS, TOKEN_DECIMALS,
    TOKEN_ID, TOKEN_NAME, TOKEN_SYMBOL,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub address: Address,
    pub total_supply: BigDecimal,
    pub max_supply: BigInt,
    pub holders_count: BigInt,
}

impl Token {
    pub fn new() -> Self {
        Token {
            id: TOKEN_ID.to_string(),
            name: TOKEN_NAME.to_string(),
            symbol: TOKEN_SYMBOL.to_string(),
            decimals: TOKEN_DECIMALS,
            address: TOKEN_ADDRESS,
            total_supply: BigDecimal::from(DEFAULT_TOTAL_SUPPLY),
            max_supply: BigInt::from(DEFAULT_MAX_SUPPLY),
            holders_count: BigInt::from(0),
        }
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

/// Running balance of one account.
///
/// `balance_raw` is signed: transfers are applied without checking that the
/// sender holds enough, so an account first seen as a sender goes negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Holder {
    pub id: String,
    pub balance_raw: BigInt,
    pub balance: BigDecimal,
    pub token: Option<String>,
}

impl Holder {
    pub fn new(id: &str) -> Self {
        Holder {
            id: id.to_string(),
            balance_raw: BigInt::from(0),
            balance: BigDecimal::from(0),
            token: None,
        }
    }

    /// Replace the raw balance and recompute the scaled one.
    pub fn set_balance_raw(&mut self, balance_raw: BigInt) {
        self.balance = scale_raw(&balance_raw);
        self.balance_raw = balance_raw;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub id: String,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub value: BigDecimal,
    pub timestamp: u64,
    pub block_number: u64,
    pub gas_price: Option<u128>,
    pub gas_used: Option<u64>,
}

impl Transfer {
    pub fn new(id: &str) -> Self {
        Transfer {
            id: id.to_string(),
            from: None,
            to: None,
            value: BigDecimal::from(0),
            timestamp: 0,
            block_number: 0,
            gas_price: None,
            gas_used: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub timestamp: u64,
    pub block_number: u64,
}

impl Transaction {
    pub fn new(id: &str) -> Self {
        Transaction {
            id: id.to_string(),
            from: None,
            to: None,
            timestamp: 0,
            block_number: 0,
        }
    }
}

/// Entity id for an account: lowercase, `0x`-prefixed hex.
pub fn address_id(address: &Address) -> String {
    format!("{address:#x}")
}

pub fn u256_to_bigint(value: U256) -> BigInt {
    BigInt::from(BigUint::from_bytes_be(&value.to_be_bytes::<32>()))
}

/// Divide a raw amount by 10^18 without rounding.
pub fn scale_raw(raw: &BigInt) -> BigDecimal {
    BigDecimal::new(raw.clone(), SCALE_EXPONENT)
}
