//! Proptest generators for property-based testing.

use proptest::prelude::*;

use collateral_ledger::LedgerConfig;
use collateral_ledger_core::{
    AccountId, Amount, IdPolicy, LedgerPolicy, RelockPolicy, SlashPolicy, WithdrawAuthority,
};

/// Generate a random AccountId.
pub fn account_id() -> impl Strategy<Value = AccountId> {
    any::<[u8; 32]>().prop_map(AccountId::from_bytes)
}

/// Generate a non-zero deposit amount small enough that sums never overflow.
pub fn amount() -> impl Strategy<Value = Amount> {
    1u128..=10_000
}

pub fn ledger_policy() -> impl Strategy<Value = LedgerPolicy> {
    (
        prop_oneof![Just(SlashPolicy::Partial), Just(SlashPolicy::Full)],
        prop_oneof![
            Just(WithdrawAuthority::Depositor),
            Just(WithdrawAuthority::Anyone)
        ],
        prop_oneof![Just(RelockPolicy::Idempotent), Just(RelockPolicy::Strict)],
    )
        .prop_map(|(slash, withdraw, relock)| LedgerPolicy {
            slash,
            withdraw,
            relock,
        })
}

pub fn id_policy() -> impl Strategy<Value = IdPolicy> {
    prop_oneof![
        Just(IdPolicy::Sequential),
        "[a-z]{0,12}".prop_map(|domain| IdPolicy::Derived { domain }),
    ]
}

pub fn ledger_config() -> impl Strategy<Value = LedgerConfig> {
    (id_policy(), ledger_policy())
        .prop_map(|(id_policy, policy)| LedgerConfig { id_policy, policy })
}

/// One step of a random ledger session.
///
/// `party` indexes the handler's accounts (index 0 is the arbiter) and
/// `target` indexes the deposits created so far, both modulo their length.
/// Lifetimes are relative to the session clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Deposit {
        party: usize,
        value: Amount,
        ttl: u64,
        lock: bool,
    },
    Prepare {
        party: usize,
        value: Amount,
        ttl: u64,
    },
    Fund {
        party: usize,
        target: usize,
    },
    Lock {
        party: usize,
        target: usize,
        ttl: u64,
    },
    Slash {
        party: usize,
        target: usize,
        amount: Option<Amount>,
    },
    Withdraw {
        party: usize,
        target: usize,
    },
    /// Move the clock forward.
    Advance { secs: u64 },
    /// Toggle the token's pause switch.
    TogglePause,
}

impl Arbitrary for Op {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        let party = 0usize..8;
        let target = 0usize..32;
        let ttl = 0u64..40;

        prop_oneof![
            4 => (party.clone(), amount(), ttl.clone(), any::<bool>())
                .prop_map(|(party, value, ttl, lock)| Op::Deposit { party, value, ttl, lock }),
            2 => (party.clone(), amount(), ttl.clone())
                .prop_map(|(party, value, ttl)| Op::Prepare { party, value, ttl }),
            2 => (party.clone(), target.clone())
                .prop_map(|(party, target)| Op::Fund { party, target }),
            3 => (party.clone(), target.clone(), ttl)
                .prop_map(|(party, target, ttl)| Op::Lock { party, target, ttl }),
            3 => (party.clone(), target.clone(), prop::option::of(0u128..=5_000))
                .prop_map(|(party, target, amount)| Op::Slash { party, target, amount }),
            3 => (party, target)
                .prop_map(|(party, target)| Op::Withdraw { party, target }),
            2 => (0u64..15).prop_map(|secs| Op::Advance { secs }),
            1 => Just(Op::TogglePause),
        ]
        .boxed()
    }
}

/// Generate a session of up to `max_len` operations.
pub fn op_sequence(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(any::<Op>(), 1..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collateral_ledger_core::derive_deposit_id;

    proptest! {
        #[test]
        fn test_derived_ids_differ_by_nonce(
            creator in account_id(),
            domain in "[a-z]{0,12}",
            nonce in 0u64..u64::MAX,
        ) {
            let a = derive_deposit_id(&domain, &creator, nonce);
            let b = derive_deposit_id(&domain, &creator, nonce + 1);
            prop_assert_ne!(a, b);
        }

        #[test]
        fn test_derived_ids_differ_by_creator(
            c1 in account_id(),
            c2 in account_id(),
            nonce in any::<u64>(),
        ) {
            prop_assume!(c1 != c2);
            prop_assert_ne!(
                derive_deposit_id("", &c1, nonce),
                derive_deposit_id("", &c2, nonce)
            );
        }
    }
}
