//! Model-based invariant checking.
//!
//! [`InvariantHandler`] drives a ledger with arbitrary [`Op`]s, including
//! ones that must be rejected, and after every step checks:
//!
//! - the custodian's balance equals the ledger's custodied total,
//! - the token's burned total equals the sum of all slashed value,
//! - no deposit's value increases and no terminal deposit changes,
//! - a rejected call leaves its record and the allocator untouched.

use std::collections::HashMap;

use collateral_ledger::{LedgerConfig, LedgerError};
use collateral_ledger_core::{
    AccountId, Amount, CallContext, Deposit, DepositId, DepositRequest, DepositTerms, Timestamp,
};
use collateral_ledger_store::Store;

use crate::fixtures::{multi_party_accounts, FixtureLedger, TestFixture};
use crate::generators::Op;

/// Drives a fixture ledger and checks invariants after each step.
pub struct InvariantHandler {
    fixture: TestFixture,
    /// Index 0 is the arbiter of every deposit the handler creates.
    accounts: Vec<AccountId>,
    now: u64,
    deposits: Vec<DepositId>,
    seen: HashMap<DepositId, Deposit>,
    slashed: Amount,
    pub accepted: usize,
    pub rejected: usize,
}

impl InvariantHandler {
    pub fn new(config: LedgerConfig) -> Self {
        let fixture = TestFixture::with_seed(0x5E, config);
        let mut accounts = vec![fixture.arbiter, fixture.depositor];
        accounts.extend(multi_party_accounts(2));
        for account in &accounts[2..] {
            fixture.endow(account);
        }

        Self {
            fixture,
            accounts,
            now: 1,
            deposits: Vec::new(),
            seen: HashMap::new(),
            slashed: 0,
            accepted: 0,
            rejected: 0,
        }
    }

    pub fn ledger(&self) -> &FixtureLedger {
        &self.fixture.ledger
    }

    /// Deposits created so far, in creation order.
    pub fn deposits(&self) -> &[DepositId] {
        &self.deposits
    }

    /// Total value slashed so far.
    pub fn slashed(&self) -> Amount {
        self.slashed
    }

    /// Apply one operation, then check every invariant.
    pub async fn step(&mut self, op: &Op) -> Result<(), String> {
        match *op {
            Op::Deposit {
                party,
                value,
                ttl,
                lock,
            } => {
                let ctx = self.ctx(party);
                let expiration = Timestamp(self.now + ttl);
                let mut request = DepositRequest::new(self.accounts[0], value, expiration);
                if lock {
                    request = request.locked_until(expiration);
                }

                let expected = self.peek(&ctx.caller).await?;
                let result = self.fixture.ledger.deposit(&ctx, &request).await;
                self.record_creation(&ctx, expected, result).await?;
            }
            Op::Prepare { party, value, ttl } => {
                let ctx = self.ctx(party);
                let terms = DepositTerms {
                    arbiter: self.accounts[0],
                    value,
                    expiration: Timestamp(self.now + ttl),
                };

                let expected = self.peek(&ctx.caller).await?;
                let result = self.fixture.ledger.prepare(&ctx, &terms).await;
                self.record_creation(&ctx, expected, result).await?;
            }
            Op::Fund { party, target } => {
                if let Some(id) = self.target(target) {
                    let ctx = self.ctx(party);
                    let before = self.load(&id).await?;
                    let result = self.fixture.ledger.fund(&ctx, &id).await;
                    self.record_transition(&id, before, result).await?;
                }
            }
            Op::Lock { party, target, ttl } => {
                if let Some(id) = self.target(target) {
                    let ctx = self.ctx(party);
                    let before = self.load(&id).await?;
                    let unlock_at = Timestamp(self.now + ttl);
                    let result = self.fixture.ledger.lock(&ctx, &id, unlock_at).await;
                    self.record_transition(&id, before, result).await?;
                }
            }
            Op::Slash {
                party,
                target,
                amount,
            } => {
                if let Some(id) = self.target(target) {
                    let ctx = self.ctx(party);
                    let before = self.load(&id).await?;
                    let result = self.fixture.ledger.slash(&ctx, &id, amount).await;
                    if let Ok(after) = &result {
                        let burned = before.value - after.value;
                        if let Some(requested) = amount {
                            if burned != requested {
                                return Err(format!(
                                    "slash of {} burned {} from {}",
                                    requested, burned, id
                                ));
                            }
                        }
                        self.slashed += burned;
                    }
                    self.record_transition(&id, before, result).await?;
                }
            }
            Op::Withdraw { party, target } => {
                if let Some(id) = self.target(target) {
                    let ctx = self.ctx(party);
                    let before = self.load(&id).await?;
                    let result = self.fixture.ledger.withdraw(&ctx, &id).await;
                    self.record_transition(&id, before, result).await?;
                }
            }
            Op::Advance { secs } => self.now += secs,
            Op::TogglePause => {
                if self.fixture.token.is_paused() {
                    self.fixture.token.resume();
                } else {
                    self.fixture.token.pause();
                }
            }
        }

        self.check_invariants().await
    }

    /// Check the global invariants against the current ledger state.
    pub async fn check_invariants(&mut self) -> Result<(), String> {
        self.fixture
            .ledger
            .check_conservation()
            .await
            .map_err(|e| e.to_string())?;

        let burned = self
            .fixture
            .token
            .burned_total()
            .map_err(|e| e.to_string())?;
        if burned != self.slashed {
            return Err(format!("burned {} but slashed {}", burned, self.slashed));
        }

        for id in self.deposits.clone() {
            let current = self.load(&id).await?;
            if let Some(prev) = self.seen.get(&id) {
                if prev.state.is_terminal() && *prev != current {
                    return Err(format!("terminal deposit {} changed", id));
                }
                if current.value > prev.value {
                    return Err(format!(
                        "value of {} grew from {} to {}",
                        id, prev.value, current.value
                    ));
                }
                if prev.depositor.is_some() && prev.depositor != current.depositor {
                    return Err(format!("depositor of {} changed", id));
                }
            }
            self.seen.insert(id, current);
        }
        Ok(())
    }

    fn ctx(&self, party: usize) -> CallContext {
        CallContext::new(self.accounts[party % self.accounts.len()], Timestamp(self.now))
    }

    fn target(&self, target: usize) -> Option<DepositId> {
        if self.deposits.is_empty() {
            return None;
        }
        Some(self.deposits[target % self.deposits.len()])
    }

    async fn peek(&self, creator: &AccountId) -> Result<DepositId, String> {
        self.fixture
            .ledger
            .peek_next_id(creator)
            .await
            .map_err(|e| e.to_string())
    }

    async fn load(&self, id: &DepositId) -> Result<Deposit, String> {
        self.fixture
            .ledger
            .store()
            .get_deposit(id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("deposit {} vanished", id))
    }

    async fn record_creation(
        &mut self,
        ctx: &CallContext,
        expected: DepositId,
        result: collateral_ledger::Result<DepositId>,
    ) -> Result<(), String> {
        match result {
            Ok(id) => {
                if id != expected {
                    return Err(format!("allocated {} but peeked {}", id, expected));
                }
                if !self.deposits.contains(&id) {
                    self.deposits.push(id);
                }
                self.accepted += 1;
            }
            Err(e) => {
                expect_rejection(e)?;
                let after = self.peek(&ctx.caller).await?;
                if after != expected {
                    return Err(format!("failed creation moved allocator to {}", after));
                }
                self.rejected += 1;
            }
        }
        Ok(())
    }

    async fn record_transition(
        &mut self,
        id: &DepositId,
        before: Deposit,
        result: collateral_ledger::Result<Deposit>,
    ) -> Result<(), String> {
        match result {
            Ok(after) => {
                let stored = self.load(id).await?;
                if stored != after {
                    return Err(format!("returned record for {} differs from stored", id));
                }
                self.accepted += 1;
            }
            Err(e) => {
                expect_rejection(e)?;
                let stored = self.load(id).await?;
                if stored != before {
                    return Err(format!("rejected call modified {}", id));
                }
                self.rejected += 1;
            }
        }
        Ok(())
    }
}

/// Guard failures and token refusals are legitimate outcomes; anything else
/// is a bug.
fn expect_rejection(err: LedgerError) -> Result<(), String> {
    match err {
        LedgerError::Deposit(_) | LedgerError::TransferFailed(_) => Ok(()),
        other => Err(format!("unexpected error: {}", other)),
    }
}
