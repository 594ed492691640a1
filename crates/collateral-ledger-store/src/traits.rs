//! Store trait: the abstract interface for ledger persistence.
//!
//! This trait allows the ledger to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use collateral_ledger_core::{
    Amount, CounterKey, Deposit, DepositId, DepositState, JournalEntry, LedgerEvent,
};

use crate::error::Result;

/// An allocator counter move made by a creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterUpdate {
    pub key: CounterKey,
    /// Value before the creation, put back by [`Store::revert_batch`].
    pub from: u128,
    pub to: u128,
}

/// Everything one ledger call writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    /// The post-transition record, stored at `deposit.id`.
    pub deposit: Deposit,
    /// Set only for creations.
    pub counter: Option<CounterUpdate>,
    /// Events to journal, in order.
    pub events: Vec<LedgerEvent>,
}

/// The Store trait: async interface for ledger persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - The store performs no validation. Guards live in the core state machine
///   and the ledger decides what to write.
/// - Counters read as 0 until first written.
/// - A [`WriteBatch`] lands all at once or not at all.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Deposit Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a deposit by id.
    async fn get_deposit(&self, id: &DepositId) -> Result<Option<Deposit>>;

    /// Insert or replace the deposit at `deposit.id`, outside any batch.
    async fn put_deposit(&self, deposit: &Deposit) -> Result<()>;

    /// List deposits, optionally filtered by state, ordered by id.
    async fn list_deposits(&self, state: Option<DepositState>) -> Result<Vec<Deposit>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Allocator Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Read an allocator counter (0 if never written).
    async fn get_counter(&self, key: &CounterKey) -> Result<u128>;

    // ─────────────────────────────────────────────────────────────────────────
    // Journal Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Journal entries with `seq > after_seq`, ordered by seq.
    async fn events_since(&self, after_seq: u64) -> Result<Vec<JournalEntry>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Batches
    // ─────────────────────────────────────────────────────────────────────────

    /// Atomically store the record, move the counter, and journal the events.
    ///
    /// Returns the position of the last event, or the current head if the
    /// batch has none.
    async fn write_batch(&self, batch: &WriteBatch) -> Result<u64>;

    /// Atomically undo the most recent [`Store::write_batch`].
    ///
    /// Puts `prior` back at the batch's deposit id (clearing the slot for
    /// `None`), resets the counter to its `from` value, and drops journal
    /// entries after `after_seq`.
    async fn revert_batch(
        &self,
        batch: &WriteBatch,
        prior: Option<&Deposit>,
        after_seq: u64,
    ) -> Result<()>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Sum of value held for funded, live deposits.
    fn custodied_total(&self) -> impl std::future::Future<Output = Result<Amount>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn custodied_total(&self) -> Result<Amount> {
        let deposits = self.list_deposits(None).await?;
        Ok(deposits.iter().map(Deposit::custodied).sum())
    }
}
