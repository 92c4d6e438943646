//! Projection of token events into the entity store.
//!
//! `handle_transfer` performs one self-contained read-modify-write cycle per
//! Transfer log. It keeps no state between calls; the token aggregate is
//! loaded from the store, threaded through the steps below and saved last.
//!
//! Replaying the same event applies its balance delta and holder-count
//! transition a second time. Exactly-once delivery is the caller's job.

use std::future::Future;

use alloy_primitives::{Address, U256};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use tracing::{debug, trace};

use crate::accessors::{get_holder, get_token, get_transaction, get_transfer};
use crate::entities::{Holder, Token, address_id, scale_raw, u256_to_bigint};
use crate::error::IndexerResult;
use crate::events::{ApprovalEvent, TransferEvent};
use crate::store::EntityStore;

/// Live read of the token contract's `totalSupply()` at the current chain head.
pub trait SupplySource {
    fn total_supply(&self, token: Address) -> impl Future<Output = IndexerResult<U256>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionOutcome {
    /// Id shared by the Transfer and Transaction records written.
    pub key: String,
    pub holders_delta: i64,
    pub holders_count: BigInt,
}

/// Change in the global holder count when a raw balance moves from `before` to `after`.
///
/// Only positive-to-zero and zero-to-positive transitions count.
pub fn holder_count_delta(before: &BigInt, after: &BigInt) -> i64 {
    if after.is_zero() && before.is_positive() {
        -1
    } else if after.is_positive() && before.is_zero() {
        1
    } else {
        0
    }
}

/// Projection key for the Transfer and Transaction records of an event.
///
/// Derived from the transaction sender only, so later transfers sent by the
/// same account overwrite earlier records.
pub fn projection_key(event: &TransferEvent) -> String {
    address_id(&event.transaction_from)
}

pub async fn handle_transfer<S, Q>(
    store: &S,
    supply: &Q,
    event: &TransferEvent,
) -> IndexerResult<ProjectionOutcome>
where
    S: EntityStore + ?Sized,
    Q: SupplySource + ?Sized,
{
    let id = projection_key(event);
    let mut token = get_token(store)?;
    let mut transfer = get_transfer(store, &id)?;
    let mut tx = get_transaction(store, &id)?;
    // Both holders are read before either is written; for a self-transfer the
    // receiver write below wins.
    let mut from_holder = get_holder(store, &address_id(&event.from))?;
    let mut to_holder = get_holder(store, &address_id(&event.to))?;

    let total_supply = supply.total_supply(event.address).await?;
    token.total_supply = scale_raw(&u256_to_bigint(total_supply));

    let value = u256_to_bigint(event.value);

    transfer.block_number = event.block_number;
    transfer.from = Some(event.from);
    transfer.to = Some(event.to);
    transfer.value = scale_raw(&value);
    transfer.timestamp = event.block_timestamp;
    transfer.gas_price = Some(event.gas_price);
    transfer.gas_used = Some(event.gas_used);
    store.save_transfer(&transfer)?;

    tx.block_number = event.block_number;
    tx.from = Some(event.transaction_from);
    tx.to = event.transaction_to;
    tx.timestamp = event.block_timestamp;
    store.save_transaction(&tx)?;

    let mut holders_delta = apply_delta(&mut token, &mut from_holder, -value.clone());
    store.save_holder(&from_holder)?;

    holders_delta += apply_delta(&mut token, &mut to_holder, value);
    store.save_holder(&to_holder)?;

    store.save_token(&token)?;

    debug!(
        key = %id,
        from = %from_holder.id,
        to = %to_holder.id,
        value = %transfer.value,
        holders_delta,
        holders_count = %token.holders_count,
        "Projected transfer"
    );

    Ok(ProjectionOutcome {
        key: id,
        holders_delta,
        holders_count: token.holders_count,
    })
}

/// Apply a signed raw delta to one holder and adjust the token's holder count.
fn apply_delta(token: &mut Token, holder: &mut Holder, delta: BigInt) -> i64 {
    let previous = holder.balance_raw.clone();
    holder.set_balance_raw(&previous + delta);
    holder.token = Some(token.id.clone());

    let change = holder_count_delta(&previous, &holder.balance_raw);
    token.holders_count += change;
    change
}

/// Approvals are accepted and ignored.
pub fn handle_approval(event: &ApprovalEvent) -> IndexerResult<()> {
    trace!(owner = %event.owner, spender = %event.spender, "Ignoring approval");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holder_count_delta_transitions() {
        let zero = BigInt::from(0);
        let one = BigInt::from(1);
        let many = BigInt::from(500);
        let negative = BigInt::from(-3);

        assert_eq!(holder_count_delta(&zero, &one), 1);
        assert_eq!(holder_count_delta(&many, &zero), -1);
        assert_eq!(holder_count_delta(&one, &many), 0);
        assert_eq!(holder_count_delta(&zero, &zero), 0);
        assert_eq!(holder_count_delta(&zero, &negative), 0);
        assert_eq!(holder_count_delta(&negative, &one), 0);
        assert_eq!(holder_count_delta(&negative, &zero), 0);
    }

    #[test]
    fn test_apply_delta_updates_holder_and_count() {
        let mut token = Token::new();
        let mut holder = Holder::new("0xabc");

        let change = apply_delta(&mut token, &mut holder, BigInt::from(10));
        assert_eq!(change, 1);
        assert_eq!(token.holders_count, BigInt::from(1));
        assert_eq!(holder.token.as_deref(), Some("Token"));
        assert_eq!(holder.balance, scale_raw(&BigInt::from(10)));

        let change = apply_delta(&mut token, &mut holder, BigInt::from(-10));
        assert_eq!(change, -1);
        assert_eq!(token.holders_count, BigInt::from(0));
    }
}
