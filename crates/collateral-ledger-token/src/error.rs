//! Error types for token operations.

use collateral_ledger_core::{AccountId, Amount};
use thiserror::Error;

/// Refusals from the custody token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The debited account holds less than requested.
    #[error("insufficient balance for {account}: need {needed}, have {available}")]
    InsufficientBalance {
        account: AccountId,
        needed: Amount,
        available: Amount,
    },

    /// The owner has not approved enough for the custodian to pull.
    #[error("insufficient allowance from {owner}: need {needed}, approved {approved}")]
    InsufficientAllowance {
        owner: AccountId,
        needed: Amount,
        approved: Amount,
    },

    /// Transfers are paused.
    #[error("token is paused")]
    Paused,

    /// A balance or the supply would overflow.
    #[error("amount overflow")]
    Overflow,

    /// Internal lock was poisoned.
    #[error("token lock poisoned: {0}")]
    Poisoned(String),
}

/// Result type for token operations.
pub type Result<T> = std::result::Result<T, TokenError>;
