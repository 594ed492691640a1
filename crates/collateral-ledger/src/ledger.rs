//! The ledger: deposits, the custodian, and the journal behind one API.
//!
//! Each mutating call loads the record fresh from the store, evaluates the
//! pure transition from `collateral_ledger_core`, then commits it:
//!
//! 1. write the post-transition record, the allocator move and the events as
//!    one atomic [`WriteBatch`],
//! 2. perform the token effect,
//! 3. on refusal, revert the batch and fail with `TransferFailed`.
//!
//! The token call is the last step that can fail, so a call either commits
//! the record, the token movement, and its events together, or leaves all of
//! them as they were.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use collateral_ledger_core::{
    AccountId, Amount, CallContext, Deposit, DepositError, DepositId, DepositRequest,
    DepositTerms, IdPolicy, JournalEntry, LedgerEvent, LedgerPolicy, Timestamp, TokenEffect,
    Transition,
};
use collateral_ledger_store::{CounterUpdate, Store, StoreExt, WriteBatch};
use collateral_ledger_token::CustodyToken;

use crate::error::{LedgerError, Result};

/// Configuration for the ledger.
///
/// Fixed at construction. Loadable from JSON or any other serde format:
///
/// ```json
/// { "id_policy": { "kind": "derived", "domain": "loans" },
///   "policy": { "slash": "full", "relock": "strict" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// How deposit ids are allocated.
    pub id_policy: IdPolicy,
    /// Slash, withdraw and re-lock behavior.
    pub policy: LedgerPolicy,
}

/// The collateral custody ledger.
///
/// Mutating operations take `&mut self`, so one ledger value serializes its
/// callers. Share it across tasks with [`crate::LedgerHandle`].
pub struct CollateralLedger<S: Store, T: CustodyToken> {
    /// The storage backend.
    store: Arc<S>,
    /// The token whose custodian account holds deposited value.
    token: T,
    /// Configuration.
    config: LedgerConfig,
}

impl<S: Store, T: CustodyToken> CollateralLedger<S, T> {
    /// Create a ledger over `store` and `token`.
    pub fn new(store: S, token: T, config: LedgerConfig) -> Self {
        Self {
            store: Arc::new(store),
            token,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the token reference.
    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Creation
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a deposit funded by the caller.
    ///
    /// Pulls `value` from the caller into custody. With `unlock_at` set the
    /// deposit is locked in the same call.
    pub async fn deposit(
        &mut self,
        ctx: &CallContext,
        request: &DepositRequest,
    ) -> Result<DepositId> {
        self.create(ctx, |id| Deposit::open(id, request, ctx)).await
    }

    /// Create an unfunded deposit. Anyone may fund it later with [`Self::fund`].
    pub async fn prepare(&mut self, ctx: &CallContext, terms: &DepositTerms) -> Result<DepositId> {
        self.create(ctx, |id| Deposit::prepare(id, terms, ctx)).await
    }

    async fn create<F>(&mut self, ctx: &CallContext, build: F) -> Result<DepositId>
    where
        F: FnOnce(DepositId) -> collateral_ledger_core::Result<Transition>,
    {
        let policy = &self.config.id_policy;
        let current = self.store.get_counter(&policy.counter_key(&ctx.caller)).await?;
        let allocation = policy.allocate(&ctx.caller, current)?;
        let transition = build(allocation.id)?;

        let prior = self.store.get_deposit(&allocation.id).await?;
        if let Some(existing) = &prior {
            if !existing.may_reuse_slot(&ctx.caller) {
                warn!(
                    deposit_id = %allocation.id,
                    caller = %ctx.caller,
                    state = %existing.state,
                    "allocated id is held by another deposit"
                );
                return Err(DepositError::IdUnavailable(allocation.id).into());
            }
        }

        let counter = CounterUpdate {
            key: allocation.counter,
            from: current,
            to: allocation.next,
        };
        self.commit(ctx, prior.as_ref(), transition, Some(counter)).await?;
        Ok(allocation.id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Fund a prepared deposit. The caller becomes its depositor.
    pub async fn fund(&mut self, ctx: &CallContext, id: &DepositId) -> Result<Deposit> {
        let current = self.load(id).await?;
        let transition = current.fund(ctx)?;
        self.commit(ctx, Some(&current), transition, None).await
    }

    /// Arm slashing until `unlock_at`. Arbiter only.
    pub async fn lock(
        &mut self,
        ctx: &CallContext,
        id: &DepositId,
        unlock_at: Timestamp,
    ) -> Result<Deposit> {
        let current = self.load(id).await?;
        let transition = current.lock(ctx, unlock_at, &self.config.policy)?;
        self.commit(ctx, Some(&current), transition, None).await
    }

    /// Burn `amount` (or everything, for `None`) of a locked deposit. Arbiter
    /// only, strictly before expiration.
    pub async fn slash(
        &mut self,
        ctx: &CallContext,
        id: &DepositId,
        amount: Option<Amount>,
    ) -> Result<Deposit> {
        let current = self.load(id).await?;
        let transition = current.slash(ctx, amount, &self.config.policy)?;
        self.commit(ctx, Some(&current), transition, None).await
    }

    /// Pay the remaining value out to the depositor.
    pub async fn withdraw(&mut self, ctx: &CallContext, id: &DepositId) -> Result<Deposit> {
        let current = self.load(id).await?;
        let transition = current.withdraw(ctx, &self.config.policy)?;
        self.commit(ctx, Some(&current), transition, None).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a funded deposit that still holds value.
    ///
    /// Fails with `NotFound` if no record exists, it has not been funded, or
    /// it was slashed down to zero.
    pub async fn get_deposit(&self, id: &DepositId) -> Result<Deposit> {
        match self.store.get_deposit(id).await? {
            Some(deposit) if deposit.is_funded() && deposit.value > 0 => Ok(deposit),
            _ => Err(DepositError::NotFound(*id).into()),
        }
    }

    /// Get a prepared deposit that is still waiting for its funder.
    pub async fn get_prepared(&self, id: &DepositId) -> Result<Deposit> {
        match self.store.get_deposit(id).await? {
            Some(deposit) if !deposit.is_funded() => Ok(deposit),
            _ => Err(DepositError::NotFound(*id).into()),
        }
    }

    /// Whether the arbiter may slash the deposit at `now`.
    ///
    /// Looks the deposit up like [`Self::get_deposit`].
    pub async fn is_slashable(&self, id: &DepositId, now: Timestamp) -> Result<bool> {
        Ok(self.get_deposit(id).await?.is_slashable(now))
    }

    /// The id the next creation by `creator` will receive.
    pub async fn peek_next_id(&self, creator: &AccountId) -> Result<DepositId> {
        let policy = &self.config.id_policy;
        let current = self.store.get_counter(&policy.counter_key(creator)).await?;
        Ok(policy.allocate(creator, current)?.id)
    }

    /// Journal entries after `after_seq`, in order.
    pub async fn events_since(&self, after_seq: u64) -> Result<Vec<JournalEntry>> {
        Ok(self.store.events_since(after_seq).await?)
    }

    /// Value the ledger believes it holds: funded, live deposits.
    pub async fn custodied_total(&self) -> Result<Amount> {
        Ok(self.store.custodied_total().await?)
    }

    /// Compare the ledger's books with the custodian's token balance.
    ///
    /// Returns the agreed amount.
    pub async fn check_conservation(&self) -> Result<Amount> {
        let custodied = self.store.custodied_total().await?;
        let held = self
            .token
            .custody_balance()
            .await
            .map_err(LedgerError::Token)?;

        if custodied != held {
            warn!(custodied, held, "custody balance disagrees with ledger");
            return Err(LedgerError::ConservationViolated { custodied, held });
        }
        Ok(held)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    async fn load(&self, id: &DepositId) -> Result<Deposit> {
        self.store
            .get_deposit(id)
            .await?
            .ok_or_else(|| DepositError::NotFound(*id).into())
    }

    /// Write the batch, then interact. `prior` is what occupied the slot
    /// before, restored with the counter and journal if the token refuses.
    async fn commit(
        &self,
        ctx: &CallContext,
        prior: Option<&Deposit>,
        transition: Transition,
        counter: Option<CounterUpdate>,
    ) -> Result<Deposit> {
        if transition.is_noop() {
            debug!(deposit_id = %transition.deposit.id, caller = %ctx.caller, "no-op transition");
            return Ok(transition.deposit);
        }

        let Transition {
            deposit,
            effect,
            events,
        } = transition;
        let batch = WriteBatch {
            deposit,
            counter,
            events,
        };

        let head = self.store.write_batch(&batch).await?;

        if let Err(e) = self.apply(effect).await {
            warn!(
                deposit_id = %batch.deposit.id,
                caller = %ctx.caller,
                error = %e,
                "token refused, reverting"
            );
            let after_seq = head.saturating_sub(batch.events.len() as u64);
            self.store.revert_batch(&batch, prior, after_seq).await?;
            return Err(LedgerError::TransferFailed(e));
        }

        for event in &batch.events {
            log_event(ctx, &batch.deposit, event);
        }
        Ok(batch.deposit)
    }

    async fn apply(&self, effect: TokenEffect) -> collateral_ledger_token::Result<()> {
        match effect {
            TokenEffect::None => Ok(()),
            TokenEffect::TransferIn { from, amount } => self.token.transfer_in(&from, amount).await,
            TokenEffect::TransferOut { to, amount } => self.token.transfer_out(&to, amount).await,
            TokenEffect::Burn { amount } => self.token.burn(amount).await,
        }
    }
}

fn log_event(ctx: &CallContext, deposit: &Deposit, event: &LedgerEvent) {
    let deposit_id = deposit.id;
    let caller = ctx.caller;
    match event {
        LedgerEvent::Created { value, .. } => {
            debug!(%deposit_id, %caller, amount = *value, "deposit created")
        }
        LedgerEvent::Funded { .. } => {
            debug!(%deposit_id, %caller, amount = deposit.value, "deposit funded")
        }
        LedgerEvent::Locked { .. } => {
            debug!(%deposit_id, %caller, unlock_at = %deposit.expiration, "deposit locked")
        }
        LedgerEvent::Slashed { amount, .. } if deposit.state.is_terminal() => {
            info!(%deposit_id, %caller, amount = *amount, "deposit slashed")
        }
        LedgerEvent::Slashed { amount, .. } => {
            debug!(
                %deposit_id,
                %caller,
                amount = *amount,
                remaining = deposit.value,
                "deposit partially slashed"
            )
        }
        LedgerEvent::Withdrawn { .. } => {
            info!(%deposit_id, %caller, amount = deposit.value, "deposit withdrawn")
        }
    }
}
