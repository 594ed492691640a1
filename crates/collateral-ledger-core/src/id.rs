//! Deposit identifier allocation.
//!
//! Two strategies share one persisted counter abstraction:
//!
//! - **Sequential**: a ledger-wide counter holding the last issued id.
//! - **Derived**: `Blake3(ID_DOMAIN || domain || ":" || creator || nonce_be)`
//!   truncated to 16 bytes, where the counter holds the creator's next nonce.
//!   A creator can compute its next id before submitting.
//!
//! Allocation is pure: it reads the current counter and returns the id plus
//! the counter value to persist once the creation commits.

use serde::{Deserialize, Serialize};

use crate::error::{DepositError, Result};
use crate::policy::IdPolicy;
use crate::types::{AccountId, DepositId};

/// Domain separator for derived deposit ids.
pub const ID_DOMAIN: &[u8] = b"collateral-deposit-v0:";

/// Key of a persisted allocator counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterKey {
    /// The ledger-wide sequence (last issued id).
    Sequence,
    /// A creator's next nonce.
    Nonce(AccountId),
}

/// An allocated id and the counter update that claims it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub id: DepositId,
    pub counter: CounterKey,
    /// Counter value to persist after the creation commits.
    pub next: u128,
}

/// Derive a deposit id from domain, creator and nonce.
pub fn derive_deposit_id(domain: &str, creator: &AccountId, nonce: u64) -> DepositId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ID_DOMAIN);
    hasher.update(domain.as_bytes());
    hasher.update(b":");
    hasher.update(creator.as_bytes());
    hasher.update(&nonce.to_be_bytes());
    let digest = hasher.finalize();

    let mut id = [0u8; 16];
    id.copy_from_slice(&digest.as_bytes()[..16]);
    DepositId(id)
}

/// The id issued for a given sequence number.
pub const fn sequential_deposit_id(seq: u128) -> DepositId {
    DepositId::from_u128(seq)
}

impl IdPolicy {
    /// The counter this policy consults for `creator`.
    pub fn counter_key(&self, creator: &AccountId) -> CounterKey {
        match self {
            IdPolicy::Sequential => CounterKey::Sequence,
            IdPolicy::Derived { .. } => CounterKey::Nonce(*creator),
        }
    }

    /// Allocate the next id given the counter's current value.
    pub fn allocate(&self, creator: &AccountId, current: u128) -> Result<Allocation> {
        let counter = self.counter_key(creator);
        match self {
            IdPolicy::Sequential => {
                let next = current
                    .checked_add(1)
                    .ok_or(DepositError::IdUnavailable(DepositId::from_u128(u128::MAX)))?;
                Ok(Allocation {
                    id: sequential_deposit_id(next),
                    counter,
                    next,
                })
            }
            IdPolicy::Derived { domain } => {
                let nonce = u64::try_from(current)
                    .map_err(|_| DepositError::IdUnavailable(DepositId::ZERO))?;
                Ok(Allocation {
                    id: derive_deposit_id(domain, creator, nonce),
                    counter,
                    next: current + 1,
                })
            }
        }
    }
}
