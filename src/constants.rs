use alloy_primitives::{Address, address};

/// Id of the singleton token aggregate.
pub const TOKEN_ID: &str = "Token";

pub const TOKEN_NAME: &str = "KEEP Token";
pub const TOKEN_SYMBOL: &str = "KEEP";
pub const TOKEN_DECIMALS: u8 = 18;
pub const TOKEN_ADDRESS: Address = address!("85eee30c52b0b379b046fb0f85f4f3dc3009afec");

/// Mint/burn counterparty. Not special-cased by the projection.
pub const ZERO_ADDRESS: Address = Address::ZERO;

/// Supply reported before the first on-chain refresh.
pub const DEFAULT_TOTAL_SUPPLY: u64 = 1_000_000_000;
pub const DEFAULT_MAX_SUPPLY: u64 = 21_000_000;

/// Exponent of the divisor used to scale raw amounts.
///
/// Hardcoded rather than read from `TOKEN_DECIMALS`; the two are expected to agree.
pub const SCALE_EXPONENT: i64 = 18;
