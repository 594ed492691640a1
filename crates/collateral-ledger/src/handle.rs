//! Shared, serialized access to one ledger.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use collateral_ledger_core::{
    AccountId, Amount, CallContext, Deposit, DepositId, DepositRequest, DepositTerms,
    JournalEntry, Timestamp,
};
use collateral_ledger_store::Store;
use collateral_ledger_token::CustodyToken;

use crate::error::Result;
use crate::ledger::CollateralLedger;

/// A cloneable handle that owns the ledger behind an async mutex.
///
/// Every call holds the lock for the whole operation, token interaction
/// included, so concurrent callers observe a strict serial order.
pub struct LedgerHandle<S: Store, T: CustodyToken> {
    inner: Arc<Mutex<CollateralLedger<S, T>>>,
}

impl<S: Store, T: CustodyToken> Clone for LedgerHandle<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store, T: CustodyToken> LedgerHandle<S, T> {
    pub fn new(ledger: CollateralLedger<S, T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Hold the ledger exclusively, e.g. to run several calls as one unit.
    pub async fn acquire(&self) -> MutexGuard<'_, CollateralLedger<S, T>> {
        self.inner.lock().await
    }

    pub async fn deposit(&self, ctx: &CallContext, request: &DepositRequest) -> Result<DepositId> {
        self.inner.lock().await.deposit(ctx, request).await
    }

    pub async fn prepare(&self, ctx: &CallContext, terms: &DepositTerms) -> Result<DepositId> {
        self.inner.lock().await.prepare(ctx, terms).await
    }

    pub async fn fund(&self, ctx: &CallContext, id: &DepositId) -> Result<Deposit> {
        self.inner.lock().await.fund(ctx, id).await
    }

    pub async fn lock(
        &self,
        ctx: &CallContext,
        id: &DepositId,
        unlock_at: Timestamp,
    ) -> Result<Deposit> {
        self.inner.lock().await.lock(ctx, id, unlock_at).await
    }

    pub async fn slash(
        &self,
        ctx: &CallContext,
        id: &DepositId,
        amount: Option<Amount>,
    ) -> Result<Deposit> {
        self.inner.lock().await.slash(ctx, id, amount).await
    }

    pub async fn withdraw(&self, ctx: &CallContext, id: &DepositId) -> Result<Deposit> {
        self.inner.lock().await.withdraw(ctx, id).await
    }

    pub async fn get_deposit(&self, id: &DepositId) -> Result<Deposit> {
        self.inner.lock().await.get_deposit(id).await
    }

    pub async fn get_prepared(&self, id: &DepositId) -> Result<Deposit> {
        self.inner.lock().await.get_prepared(id).await
    }

    pub async fn is_slashable(&self, id: &DepositId, now: Timestamp) -> Result<bool> {
        self.inner.lock().await.is_slashable(id, now).await
    }

    pub async fn peek_next_id(&self, creator: &AccountId) -> Result<DepositId> {
        self.inner.lock().await.peek_next_id(creator).await
    }

    pub async fn events_since(&self, after_seq: u64) -> Result<Vec<JournalEntry>> {
        self.inner.lock().await.events_since(after_seq).await
    }

    pub async fn custodied_total(&self) -> Result<Amount> {
        self.inner.lock().await.custodied_total().await
    }

    pub async fn check_conservation(&self) -> Result<Amount> {
        self.inner.lock().await.check_conservation().await
    }
}
