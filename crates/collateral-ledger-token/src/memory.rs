//! In-memory token implementation.
//!
//! Balances live in a map guarded by an RwLock. Allowances are tracked only
//! toward the custodian, which is the single spender the ledger needs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use collateral_ledger_core::{AccountId, Amount};

use crate::error::{Result, TokenError};
use crate::traits::CustodyToken;

/// In-memory fungible token with an explicit custodian account.
pub struct MemoryToken {
    custodian: AccountId,
    paused: AtomicBool,
    inner: RwLock<Ledger>,
}

#[derive(Default)]
struct Ledger {
    balances: HashMap<AccountId, Amount>,
    /// Amount each owner has approved the custodian to pull.
    allowances: HashMap<AccountId, Amount>,
    total_supply: Amount,
    burned: Amount,
}

impl Ledger {
    fn balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn debit(&mut self, account: &AccountId, amount: Amount) -> Result<()> {
        let available = self.balance(account);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                account: *account,
                needed: amount,
                available,
            });
        }
        self.balances.insert(*account, available - amount);
        Ok(())
    }

    fn credit(&mut self, account: &AccountId, amount: Amount) -> Result<()> {
        let balance = self
            .balance(account)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.balances.insert(*account, balance);
        Ok(())
    }
}

impl MemoryToken {
    /// Create an empty token whose custody account is `custodian`.
    pub fn new(custodian: AccountId) -> Self {
        Self {
            custodian,
            paused: AtomicBool::new(false),
            inner: RwLock::new(Ledger::default()),
        }
    }

    /// Create `amount` new tokens in `to`.
    pub fn mint(&self, to: &AccountId, amount: Amount) -> Result<()> {
        let mut inner = self.write()?;
        let supply = inner
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        inner.credit(to, amount)?;
        inner.total_supply = supply;
        Ok(())
    }

    /// Set the amount `owner` allows the custodian to pull.
    pub fn approve(&self, owner: &AccountId, amount: Amount) -> Result<()> {
        self.write()?.allowances.insert(*owner, amount);
        Ok(())
    }

    /// Remaining allowance from `owner` to the custodian.
    pub fn allowance(&self, owner: &AccountId) -> Result<Amount> {
        Ok(self.read()?.allowances.get(owner).copied().unwrap_or(0))
    }

    pub fn balance_of(&self, account: &AccountId) -> Result<Amount> {
        Ok(self.read()?.balance(account))
    }

    pub fn total_supply(&self) -> Result<Amount> {
        Ok(self.read()?.total_supply)
    }

    /// Sum of everything burned so far.
    pub fn burned_total(&self) -> Result<Amount> {
        Ok(self.read()?.burned)
    }

    /// Make every transfer and burn fail with [`TokenError::Paused`].
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_paused() {
            return Err(TokenError::Paused);
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Ledger>> {
        self.inner
            .read()
            .map_err(|e| TokenError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Ledger>> {
        self.inner
            .write()
            .map_err(|e| TokenError::Poisoned(e.to_string()))
    }
}

#[async_trait]
impl CustodyToken for MemoryToken {
    async fn transfer_in(&self, from: &AccountId, amount: Amount) -> Result<()> {
        self.ensure_active()?;
        let mut inner = self.write()?;

        let approved = inner.allowances.get(from).copied().unwrap_or(0);
        if approved < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: *from,
                needed: amount,
                approved,
            });
        }

        inner.debit(from, amount)?;
        if let Err(e) = inner.credit(&self.custodian, amount) {
            // Undo the debit so the movement stays all-or-nothing.
            inner.credit(from, amount)?;
            return Err(e);
        }
        inner.allowances.insert(*from, approved - amount);
        Ok(())
    }

    async fn transfer_out(&self, to: &AccountId, amount: Amount) -> Result<()> {
        self.ensure_active()?;
        let mut inner = self.write()?;

        let custodian = self.custodian;
        inner.debit(&custodian, amount)?;
        if let Err(e) = inner.credit(to, amount) {
            inner.credit(&custodian, amount)?;
            return Err(e);
        }
        Ok(())
    }

    async fn burn(&self, amount: Amount) -> Result<()> {
        self.ensure_active()?;
        let mut inner = self.write()?;

        let burned = inner.burned.checked_add(amount).ok_or(TokenError::Overflow)?;
        let custodian = self.custodian;
        inner.debit(&custodian, amount)?;
        inner.total_supply -= amount;
        inner.burned = burned;
        tracing::trace!(amount, burned, "burned custodied funds");
        Ok(())
    }

    async fn custody_balance(&self) -> Result<Amount> {
        Ok(self.read()?.balance(&self.custodian))
    }
}
