use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;
use alloy_primitives::{Address, U256};

use crate::error::{IndexerError, IndexerResult};

sol! {
    interface IKeepToken {
        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);

        function totalSupply() external view returns (uint256);
        function decimals() external view returns (uint8);
        function name() external view returns (string);
        function symbol() external view returns (string);
    }
}

pub fn decode_transfer_event(log: &Log) -> IndexerResult<IKeepToken::Transfer> {
    let log_data = log.data();
    IKeepToken::Transfer::decode_raw_log(log.topics(), &log_data.data)
        .map_err(|e| IndexerError::Decode(format!("Transfer: {e}")))
}

pub fn decode_approval_event(log: &Log) -> IndexerResult<IKeepToken::Approval> {
    let log_data = log.data();
    IKeepToken::Approval::decode_raw_log(log.topics(), &log_data.data)
        .map_err(|e| IndexerError::Decode(format!("Approval: {e}")))
}

/// Block and transaction data surrounding a log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_from: Address,
    /// `None` for contract-creation transactions.
    pub transaction_to: Option<Address>,
    pub gas_price: u128,
    pub gas_used: u64,
}

/// A decoded Transfer log together with its block and transaction context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_from: Address,
    pub transaction_to: Option<Address>,
    pub gas_price: u128,
    pub gas_used: u64,
    /// Contract that emitted the log.
    pub address: Address,
}

impl TransferEvent {
    pub fn new(decoded: &IKeepToken::Transfer, address: Address, ctx: &EventContext) -> Self {
        TransferEvent {
            from: decoded.from,
            to: decoded.to,
            value: decoded.value,
            block_number: ctx.block_number,
            block_timestamp: ctx.block_timestamp,
            transaction_from: ctx.transaction_from,
            transaction_to: ctx.transaction_to,
            gas_price: ctx.gas_price,
            gas_used: ctx.gas_used,
            address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalEvent {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub address: Address,
}

impl ApprovalEvent {
    pub fn new(decoded: &IKeepToken::Approval, address: Address) -> Self {
        ApprovalEvent {
            owner: decoded.owner,
            spender: decoded.spender,
            value: decoded.value,
            address,
        }
    }
}
