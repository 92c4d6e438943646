//! Load-or-default accessors.
//!
//! Each accessor returns the stored entity, or a freshly defaulted one when the
//! key is absent. Nothing is persisted until the caller saves the result.

use crate::constants::TOKEN_ID;
use crate::entities::{Holder, Token, Transaction, Transfer};
use crate::error::IndexerResult;
use crate::store::EntityStore;

pub fn get_token<S: EntityStore + ?Sized>(store: &S) -> IndexerResult<Token> {
    Ok(store.load_token(TOKEN_ID)?.unwrap_or_default())
}

pub fn get_holder<S: EntityStore + ?Sized>(store: &S, id: &str) -> IndexerResult<Holder> {
    Ok(store.load_holder(id)?.unwrap_or_else(|| Holder::new(id)))
}

pub fn get_transfer<S: EntityStore + ?Sized>(store: &S, id: &str) -> IndexerResult<Transfer> {
    Ok(store.load_transfer(id)?.unwrap_or_else(|| Transfer::new(id)))
}

pub fn get_transaction<S: EntityStore + ?Sized>(store: &S, id: &str) -> IndexerResult<Transaction> {
    Ok(store
        .load_transaction(id)?
        .unwrap_or_else(|| Transaction::new(id)))
}
