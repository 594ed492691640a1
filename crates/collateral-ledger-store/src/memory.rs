//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use collateral_ledger_core::{CounterKey, Deposit, DepositId, DepositState, JournalEntry};

use crate::error::{Result, StoreError};
use crate::traits::{Store, WriteBatch};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Deposits ordered by id.
    deposits: BTreeMap<DepositId, Deposit>,

    /// Allocator counters.
    counters: HashMap<CounterKey, u128>,

    /// Event journal. Entries leave only through `revert_batch`.
    journal: Vec<JournalEntry>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_deposit(&self, id: &DepositId) -> Result<Option<Deposit>> {
        Ok(self.read()?.deposits.get(id).cloned())
    }

    async fn put_deposit(&self, deposit: &Deposit) -> Result<()> {
        self.write()?.deposits.insert(deposit.id, deposit.clone());
        Ok(())
    }

    async fn list_deposits(&self, state: Option<DepositState>) -> Result<Vec<Deposit>> {
        let inner = self.read()?;
        Ok(inner
            .deposits
            .values()
            .filter(|d| state.map_or(true, |s| d.state == s))
            .cloned()
            .collect())
    }

    async fn get_counter(&self, key: &CounterKey) -> Result<u128> {
        Ok(self.read()?.counters.get(key).copied().unwrap_or(0))
    }

    async fn events_since(&self, after_seq: u64) -> Result<Vec<JournalEntry>> {
        let inner = self.read()?;
        Ok(inner
            .journal
            .iter()
            .filter(|entry| entry.seq > after_seq)
            .cloned()
            .collect())
    }

    async fn write_batch(&self, batch: &WriteBatch) -> Result<u64> {
        let mut inner = self.write()?;
        inner.deposits.insert(batch.deposit.id, batch.deposit.clone());
        if let Some(counter) = &batch.counter {
            inner.counters.insert(counter.key, counter.to);
        }

        let mut seq = inner.journal.len() as u64;
        for event in &batch.events {
            seq += 1;
            inner.journal.push(JournalEntry {
                seq,
                event: event.clone(),
            });
        }
        Ok(seq)
    }

    async fn revert_batch(
        &self,
        batch: &WriteBatch,
        prior: Option<&Deposit>,
        after_seq: u64,
    ) -> Result<()> {
        let mut inner = self.write()?;
        match prior {
            Some(deposit) => {
                inner.deposits.insert(deposit.id, deposit.clone());
            }
            None => {
                inner.deposits.remove(&batch.deposit.id);
            }
        }
        if let Some(counter) = &batch.counter {
            inner.counters.insert(counter.key, counter.from);
        }
        inner.journal.retain(|entry| entry.seq <= after_seq);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{CounterUpdate, StoreExt};
    use collateral_ledger_core::{AccountId, LedgerEvent, Timestamp};

    fn make_deposit(n: u128, state: DepositState, depositor: Option<AccountId>) -> Deposit {
        Deposit {
            id: DepositId::from_u128(n),
            creator: AccountId::from_bytes([1; 32]),
            depositor,
            arbiter: AccountId::from_bytes([2; 32]),
            value: 100 * n,
            expiration: Timestamp(1000),
            state,
            created_at: Timestamp(0),
        }
    }

    fn creation(deposit: Deposit, from: u128) -> WriteBatch {
        WriteBatch {
            counter: Some(CounterUpdate {
                key: CounterKey::Sequence,
                from,
                to: from + 1,
            }),
            events: vec![LedgerEvent::Created {
                id: deposit.id,
                arbiter: deposit.arbiter,
                value: deposit.value,
                expiration: deposit.expiration,
            }],
            deposit,
        }
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let deposit = make_deposit(1, DepositState::Unlocked, Some(AccountId::from_bytes([1; 32])));

        store.put_deposit(&deposit).await.unwrap();
        let retrieved = store.get_deposit(&deposit.id).await.unwrap().unwrap();
        assert_eq!(retrieved, deposit);
        assert!(store
            .get_deposit(&DepositId::from_u128(2))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_custodied_total_counts_funded_live_only() {
        let store = MemoryStore::new();
        let owner = Some(AccountId::from_bytes([1; 32]));

        store.put_deposit(&make_deposit(1, DepositState::Unlocked, owner)).await.unwrap();
        store.put_deposit(&make_deposit(2, DepositState::Locked, owner)).await.unwrap();
        store.put_deposit(&make_deposit(3, DepositState::Withdrawn, owner)).await.unwrap();
        store.put_deposit(&make_deposit(4, DepositState::Unlocked, None)).await.unwrap();

        assert_eq!(store.custodied_total().await.unwrap(), 300);
        assert_eq!(
            store.list_deposits(Some(DepositState::Locked)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_write_batch_applies_everything() {
        let store = MemoryStore::new();
        let deposit = make_deposit(1, DepositState::Unlocked, Some(AccountId::from_bytes([1; 32])));

        let head = store.write_batch(&creation(deposit.clone(), 0)).await.unwrap();
        assert_eq!(head, 1);
        assert_eq!(store.get_deposit(&deposit.id).await.unwrap(), Some(deposit));
        assert_eq!(store.get_counter(&CounterKey::Sequence).await.unwrap(), 1);
        assert_eq!(store.events_since(0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_revert_batch_restores_creation() {
        let store = MemoryStore::new();
        let owner = Some(AccountId::from_bytes([1; 32]));
        store
            .write_batch(&creation(make_deposit(1, DepositState::Unlocked, owner), 0))
            .await
            .unwrap();

        let batch = creation(make_deposit(2, DepositState::Unlocked, owner), 1);
        let head = store.write_batch(&batch).await.unwrap();
        assert_eq!(head, 2);

        store.revert_batch(&batch, None, head - 1).await.unwrap();
        assert!(store.get_deposit(&batch.deposit.id).await.unwrap().is_none());
        assert_eq!(store.get_counter(&CounterKey::Sequence).await.unwrap(), 1);
        assert_eq!(store.events_since(0).await.unwrap().len(), 1);

        // The reverted position is handed out again.
        assert_eq!(store.write_batch(&batch).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_revert_batch_restores_prior_record() {
        let store = MemoryStore::new();
        let before = make_deposit(1, DepositState::Locked, Some(AccountId::from_bytes([1; 32])));
        store.put_deposit(&before).await.unwrap();

        let mut after = before.clone();
        after.state = DepositState::Withdrawn;
        let batch = WriteBatch {
            deposit: after,
            counter: None,
            events: vec![LedgerEvent::Withdrawn { id: before.id }],
        };
        let head = store.write_batch(&batch).await.unwrap();

        store.revert_batch(&batch, Some(&before), head - 1).await.unwrap();
        assert_eq!(store.get_deposit(&before.id).await.unwrap(), Some(before));
        assert!(store.events_since(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counters_default_to_zero() {
        let store = MemoryStore::new();
        let key = CounterKey::Nonce(AccountId::from_bytes([9; 32]));
        assert_eq!(store.get_counter(&key).await.unwrap(), 0);

        let mut batch = creation(make_deposit(1, DepositState::Unlocked, None), 6);
        batch.counter = Some(CounterUpdate {
            key,
            from: 6,
            to: 7,
        });
        store.write_batch(&batch).await.unwrap();
        assert_eq!(store.get_counter(&key).await.unwrap(), 7);
        assert_eq!(store.get_counter(&CounterKey::Sequence).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_journal_positions() {
        let store = MemoryStore::new();
        let deposit = make_deposit(1, DepositState::Locked, None);
        let id = deposit.id;
        let batch = |events| WriteBatch {
            deposit: deposit.clone(),
            counter: None,
            events,
        };

        assert_eq!(store.write_batch(&batch(vec![])).await.unwrap(), 0);
        let last = store
            .write_batch(&batch(vec![
                LedgerEvent::Locked { id },
                LedgerEvent::Slashed { id, amount: 5 },
            ]))
            .await
            .unwrap();
        assert_eq!(last, 2);
        assert_eq!(
            store
                .write_batch(&batch(vec![LedgerEvent::Withdrawn { id }]))
                .await
                .unwrap(),
            3
        );

        let tail = store.events_since(1).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].seq, 2);
        assert_eq!(tail[0].event, LedgerEvent::Slashed { id, amount: 5 });
    }
}
