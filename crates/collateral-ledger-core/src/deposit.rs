//! Deposit records and their transitions.
//!
//! Every operation is a pure function of the current record and the caller's
//! [`CallContext`]. On success it returns a [`Transition`]: the record to
//! persist, the token movement the custodian owes, and the events to journal.
//! Guards are evaluated in a fixed order (state, funding, authorization,
//! timing, amount) so the reported error is stable.

use serde::{Deserialize, Serialize};

use crate::error::{DepositError, Result};
use crate::event::LedgerEvent;
use crate::policy::{LedgerPolicy, RelockPolicy, SlashPolicy, WithdrawAuthority};
use crate::state::DepositState;
use crate::types::{AccountId, Amount, CallContext, DepositId, Timestamp};

/// Commercial terms shared by both creation paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositTerms {
    pub arbiter: AccountId,
    pub value: Amount,
    pub expiration: Timestamp,
}

impl DepositTerms {
    /// Check creation preconditions at `now`.
    pub fn validate(&self, now: Timestamp) -> Result<()> {
        if self.value == 0 {
            return Err(DepositError::ZeroValue);
        }
        if self.expiration <= now {
            return Err(DepositError::Expired {
                expiration: self.expiration,
                now,
            });
        }
        Ok(())
    }
}

/// A funded creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub terms: DepositTerms,
    /// Lock atomically on creation, until this time.
    pub unlock_at: Option<Timestamp>,
}

impl DepositRequest {
    pub fn new(arbiter: AccountId, value: Amount, expiration: Timestamp) -> Self {
        Self {
            terms: DepositTerms {
                arbiter,
                value,
                expiration,
            },
            unlock_at: None,
        }
    }

    /// Lock the deposit as part of its creation.
    pub fn locked_until(mut self, unlock_at: Timestamp) -> Self {
        self.unlock_at = Some(unlock_at);
        self
    }
}

/// One custody commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: DepositId,
    /// Who created the record (the depositor for funded creation, the
    /// preparer for two-phase creation).
    pub creator: AccountId,
    /// Entitled to the payout. `None` until a prepared deposit is funded.
    pub depositor: Option<AccountId>,
    pub arbiter: AccountId,
    /// Remaining custodied amount. Never increases.
    pub value: Amount,
    /// Unlock time: slashable strictly before, withdrawable from then on.
    pub expiration: Timestamp,
    pub state: DepositState,
    pub created_at: Timestamp,
}

/// Token movement owed by the custodian for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEffect {
    None,
    TransferIn { from: AccountId, amount: Amount },
    TransferOut { to: AccountId, amount: Amount },
    Burn { amount: Amount },
}

/// Outcome of a successful guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub deposit: Deposit,
    pub effect: TokenEffect,
    pub events: Vec<LedgerEvent>,
}

impl Transition {
    fn unchanged(deposit: Deposit) -> Self {
        Self {
            deposit,
            effect: TokenEffect::None,
            events: Vec::new(),
        }
    }

    /// Whether the transition changes nothing.
    pub fn is_noop(&self) -> bool {
        self.effect == TokenEffect::None && self.events.is_empty()
    }
}

impl Deposit {
    /// Create an unfunded deposit (two-phase creation).
    pub fn prepare(id: DepositId, terms: &DepositTerms, ctx: &CallContext) -> Result<Transition> {
        terms.validate(ctx.now)?;

        let deposit = Deposit {
            id,
            creator: ctx.caller,
            depositor: None,
            arbiter: terms.arbiter,
            value: terms.value,
            expiration: terms.expiration,
            state: DepositState::Unlocked,
            created_at: ctx.now,
        };

        Ok(Transition {
            events: vec![LedgerEvent::Created {
                id,
                arbiter: terms.arbiter,
                value: terms.value,
                expiration: terms.expiration,
            }],
            deposit,
            effect: TokenEffect::None,
        })
    }

    /// Create a deposit funded by the caller.
    ///
    /// With `unlock_at` set the lock transition is applied in the same step.
    /// The depositor consents to it by asking, so the arbiter check does not
    /// apply.
    pub fn open(id: DepositId, request: &DepositRequest, ctx: &CallContext) -> Result<Transition> {
        let mut transition = Self::prepare(id, &request.terms, ctx)?;
        transition.deposit.depositor = Some(ctx.caller);
        transition.effect = TokenEffect::TransferIn {
            from: ctx.caller,
            amount: request.terms.value,
        };

        if let Some(unlock_at) = request.unlock_at {
            transition.deposit.arm(unlock_at, ctx.now)?;
            transition.events.push(LedgerEvent::Locked { id });
        }

        Ok(transition)
    }

    /// Fund a prepared deposit. The caller becomes the depositor.
    pub fn fund(&self, ctx: &CallContext) -> Result<Transition> {
        if self.depositor.is_some() {
            return Err(DepositError::AlreadyFunded(self.id));
        }
        if self.state.is_terminal() {
            return Err(self.unexpected("fund"));
        }
        if ctx.now >= self.expiration {
            return Err(DepositError::Expired {
                expiration: self.expiration,
                now: ctx.now,
            });
        }

        let mut deposit = self.clone();
        deposit.depositor = Some(ctx.caller);

        Ok(Transition {
            deposit,
            effect: TokenEffect::TransferIn {
                from: ctx.caller,
                amount: self.value,
            },
            events: vec![LedgerEvent::Funded {
                id: self.id,
                depositor: ctx.caller,
            }],
        })
    }

    /// Arm slashing until `unlock_at`.
    pub fn lock(
        &self,
        ctx: &CallContext,
        unlock_at: Timestamp,
        policy: &LedgerPolicy,
    ) -> Result<Transition> {
        if self.state.is_terminal() {
            return Err(self.unexpected("lock"));
        }
        if self.depositor.is_none() {
            return Err(DepositError::NotFunded(self.id));
        }
        if ctx.caller != self.arbiter {
            return Err(DepositError::NotArbiter { caller: ctx.caller });
        }
        if ctx.now >= self.expiration {
            return Err(DepositError::Expired {
                expiration: self.expiration,
                now: ctx.now,
            });
        }

        if self.state == DepositState::Locked {
            if unlock_at != self.expiration {
                return Err(DepositError::RelockMismatch {
                    current: self.expiration,
                    requested: unlock_at,
                });
            }
            return match policy.relock {
                RelockPolicy::Idempotent => Ok(Transition::unchanged(self.clone())),
                RelockPolicy::Strict => Err(self.unexpected("lock")),
            };
        }

        let mut deposit = self.clone();
        deposit.arm(unlock_at, ctx.now)?;

        Ok(Transition {
            deposit,
            effect: TokenEffect::None,
            events: vec![LedgerEvent::Locked { id: self.id }],
        })
    }

    /// Burn some or all of the remaining value.
    ///
    /// `None` burns everything. A slash that exhausts the value moves the
    /// deposit to `Slashed`.
    pub fn slash(
        &self,
        ctx: &CallContext,
        amount: Option<Amount>,
        policy: &LedgerPolicy,
    ) -> Result<Transition> {
        if self.state != DepositState::Locked {
            return Err(self.unexpected("slash"));
        }
        if ctx.caller != self.arbiter {
            return Err(DepositError::NotArbiter { caller: ctx.caller });
        }
        if ctx.now >= self.expiration {
            return Err(DepositError::Expired {
                expiration: self.expiration,
                now: ctx.now,
            });
        }

        let remaining = self.value;
        let burned = match amount {
            None => remaining,
            Some(0) => return Err(DepositError::ZeroValue),
            Some(requested) if requested > remaining => {
                return Err(DepositError::AmountTooLarge {
                    requested,
                    remaining,
                })
            }
            Some(requested) => match policy.slash {
                SlashPolicy::Partial => requested,
                SlashPolicy::Full if requested == remaining => requested,
                SlashPolicy::Full => {
                    return Err(DepositError::PartialSlashDisabled {
                        requested,
                        remaining,
                    })
                }
            },
        };

        let mut deposit = self.clone();
        deposit.value = remaining - burned;
        if deposit.value == 0 {
            deposit.state = DepositState::Slashed;
        }

        Ok(Transition {
            deposit,
            effect: TokenEffect::Burn { amount: burned },
            events: vec![LedgerEvent::Slashed {
                id: self.id,
                amount: burned,
            }],
        })
    }

    /// Pay the remaining value out to the depositor.
    pub fn withdraw(&self, ctx: &CallContext, policy: &LedgerPolicy) -> Result<Transition> {
        if self.state.is_terminal() {
            return Err(self.unexpected("withdraw"));
        }
        let depositor = self.depositor.ok_or(DepositError::NotFunded(self.id))?;
        if policy.withdraw == WithdrawAuthority::Depositor && ctx.caller != depositor {
            return Err(DepositError::NotDepositor { caller: ctx.caller });
        }
        if self.state == DepositState::Locked && ctx.now < self.expiration {
            return Err(DepositError::NotYetExpired {
                expiration: self.expiration,
                now: ctx.now,
            });
        }

        let mut deposit = self.clone();
        deposit.state = DepositState::Withdrawn;

        Ok(Transition {
            deposit,
            effect: TokenEffect::TransferOut {
                to: depositor,
                amount: self.value,
            },
            events: vec![LedgerEvent::Withdrawn { id: self.id }],
        })
    }

    /// Whether the arbiter may slash at `now`.
    pub fn is_slashable(&self, now: Timestamp) -> bool {
        self.state == DepositState::Locked && now < self.expiration
    }

    /// Whether a depositor has funded this record.
    pub fn is_funded(&self) -> bool {
        self.depositor.is_some()
    }

    /// Amount this deposit currently contributes to the custody balance.
    pub fn custodied(&self) -> Amount {
        if self.is_funded() && self.state.is_live() {
            self.value
        } else {
            0
        }
    }

    /// Whether `caller` may claim this record's id for a new deposit.
    ///
    /// Only terminal records are reclaimable, and only by the identity that
    /// held them.
    pub fn may_reuse_slot(&self, caller: &AccountId) -> bool {
        self.state.is_terminal() && self.depositor.unwrap_or(self.creator) == *caller
    }

    fn arm(&mut self, unlock_at: Timestamp, now: Timestamp) -> Result<()> {
        if now >= self.expiration {
            return Err(DepositError::Expired {
                expiration: self.expiration,
                now,
            });
        }
        if unlock_at <= now {
            return Err(DepositError::Expired {
                expiration: unlock_at,
                now,
            });
        }
        if unlock_at > self.expiration {
            return Err(DepositError::UnlockBeyondExpiration {
                unlock_at,
                expiration: self.expiration,
            });
        }
        self.expiration = unlock_at;
        self.state = DepositState::Locked;
        Ok(())
    }

    fn unexpected(&self, operation: &'static str) -> DepositError {
        DepositError::UnexpectedState {
            operation,
            actual: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DEPOSITOR: AccountId = AccountId::from_bytes([1; 32]);
    const ARBITER: AccountId = AccountId::from_bytes([2; 32]);
    const STRANGER: AccountId = AccountId::from_bytes([3; 32]);

    fn at(caller: AccountId, now: u64) -> CallContext {
        CallContext::new(caller, Timestamp(now))
    }

    fn open(value: Amount, expiration: u64) -> Deposit {
        let request = DepositRequest::new(ARBITER, value, Timestamp(expiration));
        Deposit::open(DepositId::from_u128(1), &request, &at(DEPOSITOR, 0))
            .unwrap()
            .deposit
    }

    fn locked(value: Amount, expiration: u64) -> Deposit {
        open(value, expiration)
            .lock(&at(ARBITER, 0), Timestamp(expiration), &LedgerPolicy::default())
            .unwrap()
            .deposit
    }

    #[test]
    fn test_open_pulls_value_from_caller() {
        let request = DepositRequest::new(ARBITER, 100, Timestamp(10));
        let t = Deposit::open(DepositId::from_u128(1), &request, &at(DEPOSITOR, 0)).unwrap();

        assert_eq!(t.deposit.state, DepositState::Unlocked);
        assert_eq!(t.deposit.depositor, Some(DEPOSITOR));
        assert_eq!(
            t.effect,
            TokenEffect::TransferIn {
                from: DEPOSITOR,
                amount: 100
            }
        );
        assert!(matches!(t.events[..], [LedgerEvent::Created { value: 100, .. }]));
    }

    #[test]
    fn test_open_rejects_zero_and_expired() {
        let id = DepositId::from_u128(1);
        let zero = DepositRequest::new(ARBITER, 0, Timestamp(10));
        assert_eq!(
            Deposit::open(id, &zero, &at(DEPOSITOR, 0)),
            Err(DepositError::ZeroValue)
        );

        let past = DepositRequest::new(ARBITER, 100, Timestamp(5));
        assert!(matches!(
            Deposit::open(id, &past, &at(DEPOSITOR, 5)),
            Err(DepositError::Expired { .. })
        ));
    }

    #[test]
    fn test_open_with_unlock_locks_atomically() {
        let request = DepositRequest::new(ARBITER, 100, Timestamp(10)).locked_until(Timestamp(8));
        let t = Deposit::open(DepositId::from_u128(1), &request, &at(DEPOSITOR, 0)).unwrap();

        assert_eq!(t.deposit.state, DepositState::Locked);
        assert_eq!(t.deposit.expiration, Timestamp(8));
        assert_eq!(t.events.len(), 2);
        assert!(matches!(t.events[1], LedgerEvent::Locked { .. }));
    }

    #[test]
    fn test_open_with_unlock_beyond_expiration_fails() {
        let request = DepositRequest::new(ARBITER, 100, Timestamp(10)).locked_until(Timestamp(11));
        assert!(matches!(
            Deposit::open(DepositId::from_u128(1), &request, &at(DEPOSITOR, 0)),
            Err(DepositError::UnlockBeyondExpiration { .. })
        ));
    }

    #[test]
    fn test_prepare_then_fund() {
        let terms = DepositTerms {
            arbiter: ARBITER,
            value: 50,
            expiration: Timestamp(10),
        };
        let prepared = Deposit::prepare(DepositId::from_u128(1), &terms, &at(STRANGER, 0))
            .unwrap()
            .deposit;
        assert!(!prepared.is_funded());
        assert_eq!(prepared.custodied(), 0);

        let funded = prepared.fund(&at(DEPOSITOR, 3)).unwrap();
        assert_eq!(funded.deposit.depositor, Some(DEPOSITOR));
        assert_eq!(funded.deposit.creator, STRANGER);
        assert_eq!(
            funded.effect,
            TokenEffect::TransferIn {
                from: DEPOSITOR,
                amount: 50
            }
        );

        assert_eq!(
            funded.deposit.fund(&at(DEPOSITOR, 4)),
            Err(DepositError::AlreadyFunded(DepositId::from_u128(1)))
        );
    }

    #[test]
    fn test_fund_after_expiration_fails() {
        let terms = DepositTerms {
            arbiter: ARBITER,
            value: 50,
            expiration: Timestamp(10),
        };
        let prepared = Deposit::prepare(DepositId::from_u128(1), &terms, &at(STRANGER, 0))
            .unwrap()
            .deposit;
        assert!(matches!(
            prepared.fund(&at(DEPOSITOR, 10)),
            Err(DepositError::Expired { .. })
        ));
    }

    #[test]
    fn test_unfunded_cannot_lock_or_withdraw() {
        let terms = DepositTerms {
            arbiter: ARBITER,
            value: 50,
            expiration: Timestamp(10),
        };
        let prepared = Deposit::prepare(DepositId::from_u128(1), &terms, &at(STRANGER, 0))
            .unwrap()
            .deposit;
        let policy = LedgerPolicy::default();

        assert!(matches!(
            prepared.lock(&at(ARBITER, 1), Timestamp(10), &policy),
            Err(DepositError::NotFunded(_))
        ));
        assert!(matches!(
            prepared.withdraw(&at(STRANGER, 1), &policy),
            Err(DepositError::NotFunded(_))
        ));
    }

    #[test]
    fn test_lock_requires_arbiter() {
        let deposit = open(100, 10);
        let result = deposit.lock(&at(DEPOSITOR, 1), Timestamp(10), &LedgerPolicy::default());
        assert_eq!(result, Err(DepositError::NotArbiter { caller: DEPOSITOR }));
    }

    #[test]
    fn test_lock_at_expiration_fails() {
        let deposit = open(100, 10);
        assert!(matches!(
            deposit.lock(&at(ARBITER, 10), Timestamp(10), &LedgerPolicy::default()),
            Err(DepositError::Expired { .. })
        ));
    }

    #[test]
    fn test_relock_policies() {
        let deposit = locked(100, 10);

        let same = deposit
            .lock(&at(ARBITER, 2), Timestamp(10), &LedgerPolicy::default())
            .unwrap();
        assert!(same.is_noop());
        assert_eq!(same.deposit, deposit);

        assert_eq!(
            deposit.lock(&at(ARBITER, 2), Timestamp(9), &LedgerPolicy::default()),
            Err(DepositError::RelockMismatch {
                current: Timestamp(10),
                requested: Timestamp(9),
            })
        );

        let strict = LedgerPolicy {
            relock: RelockPolicy::Strict,
            ..LedgerPolicy::default()
        };
        assert!(matches!(
            deposit.lock(&at(ARBITER, 2), Timestamp(10), &strict),
            Err(DepositError::UnexpectedState {
                actual: DepositState::Locked,
                ..
            })
        ));
    }

    #[test]
    fn test_partial_slash_keeps_lock() {
        let deposit = locked(100, 10);
        let t = deposit
            .slash(&at(ARBITER, 5), Some(30), &LedgerPolicy::default())
            .unwrap();

        assert_eq!(t.deposit.value, 70);
        assert_eq!(t.deposit.state, DepositState::Locked);
        assert_eq!(t.effect, TokenEffect::Burn { amount: 30 });
        assert!(t.deposit.is_slashable(Timestamp(5)));
    }

    #[test]
    fn test_slash_exhausting_value_is_terminal() {
        let deposit = locked(100, 10);
        let t = deposit
            .slash(&at(ARBITER, 5), Some(100), &LedgerPolicy::default())
            .unwrap();
        assert_eq!(t.deposit.state, DepositState::Slashed);
        assert_eq!(t.deposit.value, 0);

        let t = deposit
            .slash(&at(ARBITER, 5), None, &LedgerPolicy::default())
            .unwrap();
        assert_eq!(t.deposit.state, DepositState::Slashed);
        assert_eq!(t.effect, TokenEffect::Burn { amount: 100 });
    }

    #[test]
    fn test_slash_guards() {
        let deposit = locked(100, 10);
        let policy = LedgerPolicy::default();

        assert_eq!(
            deposit.slash(&at(STRANGER, 5), Some(1), &policy),
            Err(DepositError::NotArbiter { caller: STRANGER })
        );
        assert_eq!(
            deposit.slash(&at(ARBITER, 5), Some(101), &policy),
            Err(DepositError::AmountTooLarge {
                requested: 101,
                remaining: 100
            })
        );
        assert_eq!(
            deposit.slash(&at(ARBITER, 5), Some(0), &policy),
            Err(DepositError::ZeroValue)
        );
        assert!(matches!(
            open(100, 10).slash(&at(ARBITER, 5), Some(1), &policy),
            Err(DepositError::UnexpectedState {
                actual: DepositState::Unlocked,
                ..
            })
        ));
    }

    #[test]
    fn test_full_slash_policy() {
        let deposit = locked(100, 10);
        let full = LedgerPolicy {
            slash: SlashPolicy::Full,
            ..LedgerPolicy::default()
        };

        assert_eq!(
            deposit.slash(&at(ARBITER, 5), Some(30), &full),
            Err(DepositError::PartialSlashDisabled {
                requested: 30,
                remaining: 100
            })
        );

        let t = deposit.slash(&at(ARBITER, 5), None, &full).unwrap();
        assert_eq!(t.deposit.state, DepositState::Slashed);
        assert_eq!(t.effect, TokenEffect::Burn { amount: 100 });
    }

    #[test]
    fn test_withdraw_unlocked_anytime() {
        let deposit = open(100, 10);
        let t = deposit
            .withdraw(&at(DEPOSITOR, 1), &LedgerPolicy::default())
            .unwrap();
        assert_eq!(t.deposit.state, DepositState::Withdrawn);
        assert_eq!(
            t.effect,
            TokenEffect::TransferOut {
                to: DEPOSITOR,
                amount: 100
            }
        );
        assert_eq!(t.deposit.custodied(), 0);
    }

    #[test]
    fn test_withdraw_authority() {
        let deposit = open(100, 10);
        assert_eq!(
            deposit.withdraw(&at(STRANGER, 1), &LedgerPolicy::default()),
            Err(DepositError::NotDepositor { caller: STRANGER })
        );

        let anyone = LedgerPolicy {
            withdraw: WithdrawAuthority::Anyone,
            ..LedgerPolicy::default()
        };
        let t = deposit.withdraw(&at(STRANGER, 1), &anyone).unwrap();
        assert_eq!(
            t.effect,
            TokenEffect::TransferOut {
                to: DEPOSITOR,
                amount: 100
            }
        );
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let policy = LedgerPolicy::default();
        let withdrawn = open(100, 10)
            .withdraw(&at(DEPOSITOR, 1), &policy)
            .unwrap()
            .deposit;
        let slashed = locked(100, 10)
            .slash(&at(ARBITER, 1), None, &policy)
            .unwrap()
            .deposit;

        for deposit in [withdrawn, slashed] {
            assert!(matches!(
                deposit.withdraw(&at(DEPOSITOR, 20), &policy),
                Err(DepositError::UnexpectedState { .. })
            ));
            assert!(matches!(
                deposit.slash(&at(ARBITER, 2), Some(1), &policy),
                Err(DepositError::UnexpectedState { .. })
            ));
            assert!(matches!(
                deposit.lock(&at(ARBITER, 2), Timestamp(10), &policy),
                Err(DepositError::UnexpectedState { .. })
            ));
        }
    }

    #[test]
    fn test_slot_reuse_rules() {
        let policy = LedgerPolicy::default();
        let live = open(100, 10);
        assert!(!live.may_reuse_slot(&DEPOSITOR));

        let withdrawn = live.withdraw(&at(DEPOSITOR, 1), &policy).unwrap().deposit;
        assert!(withdrawn.may_reuse_slot(&DEPOSITOR));
        assert!(!withdrawn.may_reuse_slot(&STRANGER));
    }

    proptest! {
        #[test]
        fn prop_withdraw_waits_for_expiration(expiration in 1u64..1_000, t in 0u64..2_000) {
            let deposit = locked(100, expiration);
            let result = deposit.withdraw(&at(DEPOSITOR, t), &LedgerPolicy::default());
            if t < expiration {
                let is_not_yet_expired = matches!(result, Err(DepositError::NotYetExpired { .. }));
                prop_assert!(is_not_yet_expired);
            } else {
                prop_assert!(result.is_ok());
            }
        }

        #[test]
        fn prop_no_late_lock_or_slash(expiration in 1u64..1_000, late in 0u64..1_000) {
            let policy = LedgerPolicy::default();
            let t = expiration + late;

            let lock = open(100, expiration).lock(&at(ARBITER, t), Timestamp(expiration), &policy);
            let is_expired = matches!(lock, Err(DepositError::Expired { .. }));
            prop_assert!(is_expired);

            let slash = locked(100, expiration).slash(&at(ARBITER, t), Some(1), &policy);
            let is_expired = matches!(slash, Err(DepositError::Expired { .. }));
            prop_assert!(is_expired);
        }

        #[test]
        fn prop_slash_bound(value in 1u128..1_000_000, amount in 1u128..2_000_000) {
            let deposit = locked(value, 10);
            match deposit.slash(&at(ARBITER, 1), Some(amount), &LedgerPolicy::default()) {
                Ok(t) => {
                    prop_assert!(amount <= value);
                    prop_assert_eq!(t.deposit.value, value - amount);
                    prop_assert_eq!(t.effect, TokenEffect::Burn { amount });
                }
                Err(e) => {
                    prop_assert!(amount > value);
                    prop_assert_eq!(
                        e,
                        DepositError::AmountTooLarge { requested: amount, remaining: value }
                    );
                }
            }
        }
    }
}
