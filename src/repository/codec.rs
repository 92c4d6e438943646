//! Text encodings for values SQLite cannot hold natively.
//!
//! Big integers and decimals are stored as their canonical decimal string,
//! addresses as lowercase hex.

use alloy_primitives::Address;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::str::FromStr;

use crate::entities::address_id;
use crate::error::{IndexerError, IndexerResult};

pub fn encode_address(address: &Address) -> String {
    address_id(address)
}

pub fn parse_address(column: &str, value: &str) -> IndexerResult<Address> {
    Address::from_str(value)
        .map_err(|e| IndexerError::InvalidValue(format!("{column}: {value}: {e}")))
}

pub fn parse_optional_address(column: &str, value: Option<String>) -> IndexerResult<Option<Address>> {
    value.map(|v| parse_address(column, &v)).transpose()
}

pub fn parse_bigint(column: &str, value: &str) -> IndexerResult<BigInt> {
    BigInt::from_str(value)
        .map_err(|e| IndexerError::InvalidValue(format!("{column}: {value}: {e}")))
}

pub fn parse_decimal(column: &str, value: &str) -> IndexerResult<BigDecimal> {
    BigDecimal::from_str(value)
        .map_err(|e| IndexerError::InvalidValue(format!("{column}: {value}: {e}")))
}

pub fn parse_optional_u128(column: &str, value: Option<String>) -> IndexerResult<Option<u128>> {
    value
        .map(|v| {
            v.parse::<u128>()
                .map_err(|e| IndexerError::InvalidValue(format!("{column}: {v}: {e}")))
        })
        .transpose()
}
