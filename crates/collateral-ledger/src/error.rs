//! Error types for the ledger.

use collateral_ledger_core::{Amount, DepositError};
use collateral_ledger_store::StoreError;
use collateral_ledger_token::TokenError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A deposit guard rejected the call.
    #[error(transparent)]
    Deposit(#[from] DepositError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The token refused a transfer or burn. Nothing was committed.
    #[error("token transfer failed: {0}")]
    TransferFailed(TokenError),

    /// A read-only token query failed.
    #[error("token query failed: {0}")]
    Token(TokenError),

    /// The custodian's balance disagrees with the ledger.
    #[error("conservation violated: ledger custodies {custodied}, token holds {held}")]
    ConservationViolated { custodied: Amount, held: Amount },
}

impl LedgerError {
    /// The guard failure behind this error, if any.
    pub fn deposit_error(&self) -> Option<&DepositError> {
        match self {
            LedgerError::Deposit(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
