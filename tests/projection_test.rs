use alloy_primitives::{Address, U256};
use bigdecimal::BigDecimal;
use keep_indexer::constants::{TOKEN_ADDRESS, ZERO_ADDRESS};
use keep_indexer::entities::{Holder, Token, Transaction, Transfer, address_id, scale_raw};
use keep_indexer::error::{IndexerError, IndexerResult};
use keep_indexer::events::TransferEvent;
use keep_indexer::projector::{SupplySource, handle_transfer};
use keep_indexer::repository::{Database, HolderRepository, TransferRepository};
use keep_indexer::store::EntityStore;
use num_bigint::BigInt;
use std::str::FromStr;

struct FixedSupply(U256);

impl SupplySource for FixedSupply {
    async fn total_supply(&self, _token: Address) -> IndexerResult<U256> {
        Ok(self.0)
    }
}

struct FailingSupply;

impl SupplySource for FailingSupply {
    async fn total_supply(&self, _token: Address) -> IndexerResult<U256> {
        Err(IndexerError::Contract("execution reverted".to_string()))
    }
}

fn tokens(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18u64))
}

fn supply() -> FixedSupply {
    FixedSupply(tokens(1_000_000_000))
}

fn account(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

fn transfer_event(from: Address, to: Address, value: U256, block_number: u64) -> TransferEvent {
    TransferEvent {
        from,
        to,
        value,
        block_number,
        block_timestamp: 1_588_000_000 + block_number,
        transaction_from: from,
        transaction_to: Some(TOKEN_ADDRESS),
        gas_price: 20_000_000_000,
        gas_used: 51_000,
        address: TOKEN_ADDRESS,
    }
}

fn holder(db: &Database, address: Address) -> Holder {
    db.load_holder(&address_id(&address)).unwrap().unwrap()
}

fn token(db: &Database) -> Token {
    db.load_token("Token").unwrap().unwrap()
}

#[tokio::test]
async fn test_transfer_between_fresh_accounts() {
    let db = Database::in_memory().unwrap();
    let (a, b) = (account(0xaa), account(0xbb));

    let outcome = handle_transfer(&db, &supply(), &transfer_event(a, b, tokens(100), 10))
        .await
        .unwrap();

    // No balance check: the sender goes negative and is not counted
    let sender = holder(&db, a);
    assert_eq!(sender.balance_raw, -BigInt::from_str("100000000000000000000").unwrap());
    assert_eq!(sender.balance, BigDecimal::from(-100));

    let receiver = holder(&db, b);
    assert_eq!(receiver.balance_raw, BigInt::from_str("100000000000000000000").unwrap());
    assert_eq!(receiver.balance, BigDecimal::from(100));
    assert_eq!(receiver.token.as_deref(), Some("Token"));

    assert_eq!(outcome.holders_delta, 1);
    assert_eq!(token(&db).holders_count, BigInt::from(1));
}

#[tokio::test]
async fn test_transfer_records_event_fields() {
    let db = Database::in_memory().unwrap();
    let (a, b) = (account(0xaa), account(0xbb));
    let event = transfer_event(a, b, tokens(5) / U256::from(2u64), 42);

    let outcome = handle_transfer(&db, &supply(), &event).await.unwrap();
    assert_eq!(outcome.key, address_id(&a));

    let transfer: Transfer = db.load_transfer(&outcome.key).unwrap().unwrap();
    assert_eq!(transfer.from, Some(a));
    assert_eq!(transfer.to, Some(b));
    assert_eq!(transfer.value, BigDecimal::from_str("2.5").unwrap());
    assert_eq!(transfer.block_number, 42);
    assert_eq!(transfer.timestamp, 1_588_000_042);
    assert_eq!(transfer.gas_price, Some(20_000_000_000));
    assert_eq!(transfer.gas_used, Some(51_000));

    let transaction: Transaction = db.load_transaction(&outcome.key).unwrap().unwrap();
    assert_eq!(transaction.from, Some(a));
    assert_eq!(transaction.to, Some(TOKEN_ADDRESS));
    assert_eq!(transaction.block_number, 42);
    assert_eq!(transaction.timestamp, 1_588_000_042);
}

#[tokio::test]
async fn test_total_supply_comes_from_contract_query() {
    let db = Database::in_memory().unwrap();
    let live = FixedSupply(U256::from_str("1000000000123456789000000000").unwrap());

    handle_transfer(&db, &live, &transfer_event(account(1), account(2), tokens(1), 1))
        .await
        .unwrap();

    let token = token(&db);
    assert_eq!(
        token.total_supply,
        BigDecimal::from_str("1000000000.123456789").unwrap()
    );
    assert_eq!(token.name, "KEEP Token");
    assert_eq!(token.max_supply, BigInt::from(21_000_000));
}

#[tokio::test]
async fn test_draining_sender_decrements_holder_count() {
    let db = Database::in_memory().unwrap();
    let (a, b) = (account(0xaa), account(0xbb));

    handle_transfer(&db, &supply(), &transfer_event(ZERO_ADDRESS, a, tokens(50), 1))
        .await
        .unwrap();
    handle_transfer(&db, &supply(), &transfer_event(ZERO_ADDRESS, b, tokens(10), 2))
        .await
        .unwrap();
    assert_eq!(token(&db).holders_count, BigInt::from(2));

    let outcome = handle_transfer(&db, &supply(), &transfer_event(a, b, tokens(50), 3))
        .await
        .unwrap();

    assert_eq!(outcome.holders_delta, -1);
    assert_eq!(token(&db).holders_count, BigInt::from(1));
    assert_eq!(holder(&db, a).balance_raw, BigInt::from(0));
    assert_eq!(holder(&db, a).balance, BigDecimal::from(0));
    assert_eq!(holder(&db, b).balance, BigDecimal::from(60));
}

#[tokio::test]
async fn test_replayed_event_applies_twice() {
    let db = Database::in_memory().unwrap();
    let (a, b) = (account(0xaa), account(0xbb));

    handle_transfer(&db, &supply(), &transfer_event(ZERO_ADDRESS, a, tokens(100), 1))
        .await
        .unwrap();

    let event = transfer_event(a, b, tokens(40), 2);
    handle_transfer(&db, &supply(), &event).await.unwrap();
    handle_transfer(&db, &supply(), &event).await.unwrap();

    assert_eq!(holder(&db, a).balance, BigDecimal::from(20));
    assert_eq!(holder(&db, b).balance, BigDecimal::from(80));
    assert_eq!(token(&db).holders_count, BigInt::from(2));

    // The Transfer record is keyed by sender, so replay overwrites it
    assert_eq!(TransferRepository::new(&db.conn).count().unwrap(), 2);
}

#[tokio::test]
async fn test_transfers_from_same_sender_share_one_record() {
    let db = Database::in_memory().unwrap();
    let a = account(0xaa);

    handle_transfer(&db, &supply(), &transfer_event(a, account(1), tokens(1), 100))
        .await
        .unwrap();
    handle_transfer(&db, &supply(), &transfer_event(a, account(2), tokens(3), 200))
        .await
        .unwrap();

    assert_eq!(TransferRepository::new(&db.conn).count().unwrap(), 1);
    let transfer = db.load_transfer(&address_id(&a)).unwrap().unwrap();
    assert_eq!(transfer.to, Some(account(2)));
    assert_eq!(transfer.value, BigDecimal::from(3));
    assert_eq!(transfer.block_number, 200);
}

#[tokio::test]
async fn test_self_transfer_keeps_receiver_write() {
    let db = Database::in_memory().unwrap();
    let a = account(0xaa);

    handle_transfer(&db, &supply(), &transfer_event(ZERO_ADDRESS, a, tokens(100), 1))
        .await
        .unwrap();
    handle_transfer(&db, &supply(), &transfer_event(a, a, tokens(30), 2))
        .await
        .unwrap();

    // Both handles were read before either write; the credit overwrites the debit
    assert_eq!(holder(&db, a).balance, BigDecimal::from(130));
    assert_eq!(token(&db).holders_count, BigInt::from(1));
}

#[tokio::test]
async fn test_values_beyond_u64_are_exact() {
    let db = Database::in_memory().unwrap();
    let (a, b) = (account(0xaa), account(0xbb));
    let value = U256::from(1u64) << 200;

    handle_transfer(&db, &supply(), &transfer_event(a, b, value, 1))
        .await
        .unwrap();

    let receiver = holder(&db, b);
    let expected_raw = BigInt::from_str(&value.to_string()).unwrap();
    assert_eq!(receiver.balance_raw, expected_raw);
    assert_eq!(receiver.balance, scale_raw(&expected_raw));
    assert_eq!(holder(&db, a).balance_raw, -expected_raw);
}

#[tokio::test]
async fn test_supply_failure_persists_nothing() {
    let db = Database::in_memory().unwrap();

    let result = handle_transfer(
        &db,
        &FailingSupply,
        &transfer_event(account(1), account(2), tokens(1), 1),
    )
    .await;

    assert!(matches!(result, Err(IndexerError::Contract(_))));
    assert!(db.load_token("Token").unwrap().is_none());
    assert!(db.load_holder(&address_id(&account(2))).unwrap().is_none());
    assert!(db.load_transfer(&address_id(&account(1))).unwrap().is_none());
}

#[tokio::test]
async fn test_negative_balance_recovery_is_not_counted() {
    let db = Database::in_memory().unwrap();
    let (a, b, x) = (account(0xaa), account(0xbb), account(0xcc));
    let holders = HolderRepository::new(&db.conn);

    handle_transfer(&db, &supply(), &transfer_event(a, b, tokens(100), 1))
        .await
        .unwrap();
    assert_eq!(token(&db).holders_count, BigInt::from(1));

    // -100 to +100 is not a zero-to-positive transition
    let outcome = handle_transfer(&db, &supply(), &transfer_event(x, a, tokens(200), 2))
        .await
        .unwrap();
    assert_eq!(outcome.holders_delta, 0);
    assert_eq!(holder(&db, a).balance, BigDecimal::from(100));
    assert_eq!(token(&db).holders_count, BigInt::from(1));
    assert_eq!(holders.count_positive().unwrap(), 2);

    // Draining a still counts as positive-to-zero
    let outcome = handle_transfer(&db, &supply(), &transfer_event(a, b, tokens(100), 3))
        .await
        .unwrap();
    assert_eq!(outcome.holders_delta, -1);
    assert_eq!(token(&db).holders_count, BigInt::from(0));
    assert_eq!(holders.count_positive().unwrap(), 1);

    // b drains into x, which climbs from -200 back to zero without being counted
    handle_transfer(&db, &supply(), &transfer_event(b, x, tokens(200), 4))
        .await
        .unwrap();
    assert_eq!(holder(&db, x).balance_raw, BigInt::from(0));
    assert_eq!(token(&db).holders_count, BigInt::from(-1));
    assert_eq!(holders.count_positive().unwrap(), 0);
}

/// Deterministic generator for the property run below.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[tokio::test]
async fn test_conservation_and_holder_count_over_transfer_sequence() {
    let db = Database::in_memory().unwrap();
    let accounts: Vec<Address> = (1..=6).map(account).collect();
    let mut balances = vec![U256::ZERO; accounts.len()];
    let mut rng = Lcg(7);

    for block in 1..=200u64 {
        let to_idx = (rng.next() % accounts.len() as u64) as usize;
        let mint = rng.next() % 4 == 0;
        let event = if mint {
            let value = U256::from(rng.next()) * U256::from(1_000_000_000_000u64);
            balances[to_idx] += value;
            transfer_event(ZERO_ADDRESS, accounts[to_idx], value, block)
        } else {
            let from_idx = (rng.next() % accounts.len() as u64) as usize;
            if from_idx == to_idx {
                continue;
            }
            // Occasionally drain the sender completely
            let value = if rng.next() % 3 == 0 {
                balances[from_idx]
            } else {
                balances[from_idx] / U256::from(2u64)
            };
            balances[from_idx] -= value;
            balances[to_idx] += value;
            transfer_event(accounts[from_idx], accounts[to_idx], value, block)
        };
        handle_transfer(&db, &supply(), &event).await.unwrap();

        let holders = HolderRepository::new(&db.conn);
        let positive = holders.count_positive().unwrap();
        assert_eq!(token(&db).holders_count, BigInt::from(positive));
        // Mints debit the zero address, so the whole ledger nets to zero
        assert_eq!(holders.sum_balance_raw().unwrap(), BigInt::from(0));
    }

    for (address, expected) in accounts.iter().zip(&balances) {
        let stored = match db.load_holder(&address_id(address)).unwrap() {
            Some(holder) => holder,
            None => continue,
        };
        assert_eq!(stored.balance_raw.to_string(), expected.to_string());
        assert_eq!(stored.balance, scale_raw(&stored.balance_raw));
    }
}
