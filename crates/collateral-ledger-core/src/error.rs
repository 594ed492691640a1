//! Error types for deposit transitions.

use thiserror::Error;

use crate::state::DepositState;
use crate::types::{AccountId, Amount, DepositId, Timestamp};

/// Guard failures raised by the deposit state machine.
///
/// Each variant identifies exactly one violated precondition so callers can
/// tell a timing problem from an authorization problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DepositError {
    #[error("deposit not found: {0}")]
    NotFound(DepositId),

    #[error("value must be greater than zero")]
    ZeroValue,

    #[error("expired: expiration {expiration} is not after {now}")]
    Expired { expiration: Timestamp, now: Timestamp },

    #[error("not yet expired: expiration {expiration} is after {now}")]
    NotYetExpired { expiration: Timestamp, now: Timestamp },

    #[error("{operation} is not allowed in state {actual}")]
    UnexpectedState {
        operation: &'static str,
        actual: DepositState,
    },

    #[error("caller {caller} is not the arbiter")]
    NotArbiter { caller: AccountId },

    #[error("caller {caller} is not the depositor")]
    NotDepositor { caller: AccountId },

    #[error("slash amount {requested} exceeds remaining value {remaining}")]
    AmountTooLarge { requested: Amount, remaining: Amount },

    #[error("deposit {0} is already funded")]
    AlreadyFunded(DepositId),

    #[error("deposit {0} has not been funded")]
    NotFunded(DepositId),

    #[error("deposit already locked until {current}, requested {requested}")]
    RelockMismatch {
        current: Timestamp,
        requested: Timestamp,
    },

    #[error("unlock time {unlock_at} is beyond expiration {expiration}")]
    UnlockBeyondExpiration {
        unlock_at: Timestamp,
        expiration: Timestamp,
    },

    #[error("partial slashing is disabled: requested {requested} of {remaining}")]
    PartialSlashDisabled { requested: Amount, remaining: Amount },

    #[error("deposit id {0} is unavailable")]
    IdUnavailable(DepositId),
}

/// Result type for deposit transitions.
pub type Result<T> = std::result::Result<T, DepositError>;
