//! Get-by-key and upsert access to the four entity collections.

use crate::entities::{Holder, Token, Transaction, Transfer};
use crate::error::IndexerResult;
use crate::repository::{
    Database, HolderRepository, TokenRepository, TransactionRepository, TransferRepository,
};

pub trait EntityStore {
    fn load_token(&self, id: &str) -> IndexerResult<Option<Token>>;
    fn save_token(&self, token: &Token) -> IndexerResult<()>;

    fn load_holder(&self, id: &str) -> IndexerResult<Option<Holder>>;
    fn save_holder(&self, holder: &Holder) -> IndexerResult<()>;

    fn load_transfer(&self, id: &str) -> IndexerResult<Option<Transfer>>;
    fn save_transfer(&self, transfer: &Transfer) -> IndexerResult<()>;

    fn load_transaction(&self, id: &str) -> IndexerResult<Option<Transaction>>;
    fn save_transaction(&self, transaction: &Transaction) -> IndexerResult<()>;
}

impl EntityStore for Database {
    fn load_token(&self, id: &str) -> IndexerResult<Option<Token>> {
        TokenRepository::new(&self.conn).load(id)
    }

    fn save_token(&self, token: &Token) -> IndexerResult<()> {
        TokenRepository::new(&self.conn).save(token)
    }

    fn load_holder(&self, id: &str) -> IndexerResult<Option<Holder>> {
        HolderRepository::new(&self.conn).load(id)
    }

    fn save_holder(&self, holder: &Holder) -> IndexerResult<()> {
        HolderRepository::new(&self.conn).save(holder)
    }

    fn load_transfer(&self, id: &str) -> IndexerResult<Option<Transfer>> {
        TransferRepository::new(&self.conn).load(id)
    }

    fn save_transfer(&self, transfer: &Transfer) -> IndexerResult<()> {
        TransferRepository::new(&self.conn).save(transfer)
    }

    fn load_transaction(&self, id: &str) -> IndexerResult<Option<Transaction>> {
        TransactionRepository::new(&self.conn).load(id)
    }

    fn save_transaction(&self, transaction: &Transaction) -> IndexerResult<()> {
        TransactionRepository::new(&self.conn).save(transaction)
    }
}
